//! crucible CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crucible::builder::native::BuildCancelled;
use crucible::builder::{BuildContext, BuildExecutor, BuildPlan};
use crucible::core::Workspace;
use crucible::ops;
use crucible::sources::SourceCache;
use crucible::util::{AtomicCancellationSource, GlobalContext};

mod cli;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        if e.downcast_ref::<BuildCancelled>().is_some() {
            eprintln!("error: {:#}", e);
            std::process::exit(2);
        }
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("crucible=debug")
    } else if cli.quiet {
        EnvFilter::new("crucible=error")
    } else {
        EnvFilter::new("crucible=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let start_ctx = GlobalContext::new()?;
    let manifest_path = start_ctx.find_manifest()?;
    let gctx = GlobalContext::with_cwd(
        manifest_path
            .parent()
            .expect("manifest path always has a parent")
            .to_path_buf(),
    )?;
    let mut ws = Workspace::new(&manifest_path, &gctx)?;
    let mut source_cache = SourceCache::new(ws.root().join(".crucible").join("cache"));

    let cancel = AtomicCancellationSource::new();
    let cancel_for_handler = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_for_handler.cancel();
    })
    .ok();

    match cli.command {
        Commands::Resolve(args) => {
            let resolve = if args.force {
                ops::resolve_fresh(&ws, &mut source_cache)?
            } else {
                ops::resolve_workspace(&ws, &mut source_cache)?
            };
            println!("resolved {} package(s)", resolve.len());
            Ok(())
        }
        Commands::Build(args) => {
            let profile_name = if args.release { "release" } else { "debug" };
            ws = ws.with_profile(profile_name);
            let ctx = BuildContext::new(&ws, profile_name)?;

            let resolve = ops::resolve_workspace(&ws, &mut source_cache)?;
            let plan = BuildPlan::new(&ctx, &resolve, &mut source_cache)?;

            if args.plan {
                let json = serde_json::to_string_pretty(&plan.build_order)?;
                println!("{}", json);
                return Ok(());
            }

            if !args.no_compile_commands {
                plan.emit_compile_commands(&ctx.output_dir.join("compile_commands.json"))?;
            }

            let executor = BuildExecutor::new(&ctx)
                .verbose(cli.verbose)
                .with_cancellation(&cancel);
            let artifacts = executor.execute(&plan, args.jobs)?;
            println!("built {} artifact(s)", artifacts.len());
            Ok(())
        }
        Commands::Tree(_args) => {
            let resolve = ops::resolve_workspace(&ws, &mut source_cache)?;
            for pkg_id in resolve.package_ids() {
                println!("{} v{}", pkg_id.name(), pkg_id.version());
            }
            Ok(())
        }
        Commands::Flags(args) => {
            let ctx = BuildContext::new(&ws, "debug")?;
            let resolve = ops::resolve_workspace(&ws, &mut source_cache)?;
            let plan = BuildPlan::new(&ctx, &resolve, &mut source_cache)?;
            plan.print_flags(&args.target, args.compile, args.link)
        }
    }
}
