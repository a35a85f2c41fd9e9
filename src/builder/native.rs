//! Native C/C++ compiler driver.
//!
//! Compiles and links according to a [`BuildPlan`], skipping tasks whose
//! fingerprint shows they're already up to date.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use thiserror::Error;

use crate::builder::context::BuildContext;
use crate::builder::fingerprint::{parse_dependency_report, FingerprintDb};
use crate::builder::plan::{Artifact, BuildPlan, CompileStep, LinkStep};
use crate::builder::toolchain::{ArchiveInput, CommandSpec, CompileInput, CxxOptions, LinkInput};
use crate::builder::util::parse_define_flags;
use crate::core::surface::LinkGroup;
use crate::core::target::Language;
use crate::util::cancel::{CancellationSource, NeverCancelled};
use crate::util::fs::ensure_dir;
use crate::util::process::ProcessBuilder;

/// Distinguishes a user-requested cancellation from a generic build
/// failure, so the CLI can map it to its own exit code.
#[derive(Debug, Error)]
#[error("build cancelled")]
pub struct BuildCancelled;

/// Native C/C++ builder.
pub struct NativeBuilder<'a, 'p> {
    ctx: &'a BuildContext,
    fingerprints: Mutex<FingerprintDb>,
    cancel: &'a dyn CancellationSource,
    on_step: Option<&'p (dyn Fn() + Send + Sync)>,
}

impl<'a, 'p> NativeBuilder<'a, 'p> {
    /// Create a new native builder backed by the fingerprint database at
    /// `db_path` (created if missing). Polls no cancellation source; use
    /// [`NativeBuilder::with_cancellation`] to wire one in.
    pub fn new(ctx: &'a BuildContext, db_path: &Path) -> Result<Self> {
        Ok(NativeBuilder {
            ctx,
            fingerprints: Mutex::new(FingerprintDb::open(db_path)?),
            cancel: &NeverCancelled,
            on_step: None,
        })
    }

    /// Poll `cancel` between dispatched compile tasks.
    pub fn with_cancellation(mut self, cancel: &'a dyn CancellationSource) -> Self {
        self.cancel = cancel;
        self
    }

    /// Call `on_step` once for every completed compile or link/archive
    /// step, for driving an external progress display.
    pub fn with_progress(mut self, on_step: &'p (dyn Fn() + Send + Sync)) -> Self {
        self.on_step = Some(on_step);
        self
    }

    /// Execute the build plan.
    ///
    /// All compile steps run in parallel against a shared ready-task
    /// iterator; archive and link steps then run in build order, since a
    /// link step may depend on an archive from an earlier package.
    pub fn execute(&self, plan: &BuildPlan, jobs: Option<usize>) -> Result<Vec<Artifact>> {
        self.compile_all(&plan.compile_steps, jobs)?;

        let mut artifacts = Vec::new();
        let (archive_steps, link_steps): (Vec<_>, Vec<_>) = plan
            .link_steps
            .iter()
            .partition(|s| s.kind == "staticlib");

        for step in &archive_steps {
            artifacts.push(self.link(step)?);
            if let Some(cb) = self.on_step {
                cb();
            }
        }
        for step in &link_steps {
            artifacts.push(self.link(step)?);
            if let Some(cb) = self.on_step {
                cb();
            }
        }

        Ok(artifacts)
    }

    /// Run every compile step, skipping those whose fingerprint is fresh.
    /// Workers share a mutex-protected iterator over the step list, a
    /// failure flag, and the cancellation source; once either is set, no
    /// new task starts, but in-flight tasks are joined before returning.
    fn compile_all(&self, steps: &[CompileStep], jobs: Option<usize>) -> Result<()> {
        if steps.is_empty() {
            return Ok(());
        }

        let worker_count = jobs
            .filter(|j| *j >= 1)
            .unwrap_or_else(default_worker_count)
            .min(steps.len());

        tracing::info!("compiling {} file(s)", steps.len());

        let remaining = Mutex::new(steps.iter());
        let failed = AtomicBool::new(false);
        let errors: Mutex<Vec<anyhow::Error>> = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|| loop {
                    if should_stop(&failed, self.cancel) {
                        break;
                    }

                    let step = {
                        let mut iter = remaining.lock().unwrap();
                        iter.next()
                    };

                    let Some(step) = step else {
                        break;
                    };

                    match self.compile(step) {
                        Ok(()) => {
                            if let Some(cb) = self.on_step {
                                cb();
                            }
                        }
                        Err(e) => {
                            failed.store(true, Ordering::SeqCst);
                            errors.lock().unwrap().push(e);
                        }
                    }
                });
            }
        });

        let errors = errors.into_inner().unwrap();
        if let Some(first) = errors.into_iter().next() {
            return Err(first);
        }

        if self.cancel.is_cancelled() {
            return Err(BuildCancelled.into());
        }

        Ok(())
    }

    fn cxx_options_for(&self, lang: Language, cpp_std: Option<crate::core::target::CppStandard>) -> Option<CxxOptions> {
        if lang != Language::Cxx {
            return None;
        }
        Some(CxxOptions {
            std: cpp_std,
            exceptions: true,
            rtti: true,
            runtime: self.ctx.profile.cpp_runtime,
            msvc_runtime: self.ctx.profile.msvc_runtime,
            is_debug: !self.ctx.is_release(),
        })
    }

    /// Compile a single source file if its fingerprint is stale.
    fn compile(&self, step: &CompileStep) -> Result<()> {
        if let Some(parent) = step.output.parent() {
            ensure_dir(parent)?;
        }

        let mut cflags = self.ctx.profile_cflags();
        cflags.extend(step.cflags.iter().cloned());

        let cxx_opts = self.cxx_options_for(step.lang, step.cpp_std);

        let input = CompileInput {
            source: step.source.clone(),
            output: step.output.clone(),
            include_dirs: step.include_dirs.clone(),
            defines: parse_define_flags(&step.defines),
            cflags,
        };

        let spec = self
            .ctx
            .toolchain()
            .compile_command(&input, step.lang, cxx_opts.as_ref());
        let quoted_command = quote_command(&spec);
        let toolchain_hash = self.ctx.toolchain_hash(cxx_opts.as_ref());

        {
            let db = self.fingerprints.lock().unwrap();
            if !db.should_run(&step.output, &quoted_command, &toolchain_hash)? {
                tracing::debug!("skipping up-to-date {}", step.source.display());
                return Ok(());
            }
        }

        let cmd = self.process_builder_from_spec(spec);

        tracing::debug!(
            "compiling {} -> {}",
            step.source.display(),
            step.output.display()
        );

        let start = std::time::Instant::now();
        let output = cmd.exec()?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            bail!(
                "compilation failed for {}\n{}{}",
                step.source.display(),
                stdout,
                stderr
            );
        }

        let report = parse_dependency_report(
            self.ctx.toolchain().deps_mode(),
            &stdout,
            &step.source,
        );

        let mut db = self.fingerprints.lock().unwrap();
        db.record_success(
            &step.output,
            &quoted_command,
            &report.cleaned_output,
            &toolchain_hash,
            duration_ms,
            &report.inputs,
        )?;

        Ok(())
    }

    /// Create a static library, or link a shared library/executable.
    fn link(&self, step: &LinkStep) -> Result<Artifact> {
        if let Some(parent) = step.output.parent() {
            ensure_dir(parent)?;
        }

        match step.kind.as_str() {
            "staticlib" => self.archive(step),
            "sharedlib" => self.link_shared(step),
            "exe" => self.link_executable(step),
            other => bail!("unknown target kind: {}", other),
        }
    }

    fn archive(&self, step: &LinkStep) -> Result<Artifact> {
        let input = ArchiveInput {
            objects: step.objects.clone(),
            output: step.output.clone(),
        };

        let spec = self.ctx.toolchain().archive_command(&input);
        let cmd = self.process_builder_from_spec(spec);

        tracing::debug!("archiving {}", step.output.display());

        let output = cmd.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("archiving failed for {}\n{}", step.output.display(), stderr);
        }

        Ok(Artifact {
            path: step.output.clone(),
            target: step.target.clone(),
        })
    }

    fn link_shared(&self, step: &LinkStep) -> Result<Artifact> {
        let cxx_opts = self.cxx_options_for(step.lang, step.cpp_std);
        let (libs, mut extra_ldflags) = split_link_flags(&step.libs);
        let mut ldflags = self.ctx.profile_ldflags();
        ldflags.extend(step.ldflags.iter().cloned());
        ldflags.append(&mut extra_ldflags);
        ldflags.extend(link_group_flags(&step.groups, &self.ctx.platform.os)?);

        let input = LinkInput {
            objects: step.objects.clone(),
            output: step.output.clone(),
            lib_dirs: step.lib_dirs.clone(),
            libs,
            ldflags,
        };

        let spec = self
            .ctx
            .toolchain()
            .link_shared_command(&input, step.lang, cxx_opts.as_ref());
        let cmd = self.process_builder_from_spec(spec);

        tracing::debug!("linking shared library {}", step.output.display());

        let output = cmd.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("linking failed for {}\n{}", step.output.display(), stderr);
        }

        Ok(Artifact {
            path: step.output.clone(),
            target: step.target.clone(),
        })
    }

    fn link_executable(&self, step: &LinkStep) -> Result<Artifact> {
        let cxx_opts = self.cxx_options_for(step.lang, step.cpp_std);
        let (libs, mut extra_ldflags) = split_link_flags(&step.libs);
        let mut ldflags = self.ctx.profile_ldflags();
        ldflags.extend(step.ldflags.iter().cloned());
        ldflags.append(&mut extra_ldflags);
        ldflags.extend(link_group_flags(&step.groups, &self.ctx.platform.os)?);

        let input = LinkInput {
            objects: step.objects.clone(),
            output: step.output.clone(),
            lib_dirs: step.lib_dirs.clone(),
            libs,
            ldflags,
        };

        let spec = self
            .ctx
            .toolchain()
            .link_exe_command(&input, step.lang, cxx_opts.as_ref());
        let cmd = self.process_builder_from_spec(spec);

        tracing::debug!("linking executable {}", step.output.display());

        let output = cmd.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("linking failed for {}\n{}", step.output.display(), stderr);
        }

        Ok(Artifact {
            path: step.output.clone(),
            target: step.target.clone(),
        })
    }

    fn process_builder_from_spec(&self, spec: CommandSpec) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&spec.program);

        for arg in spec.args {
            cmd = cmd.arg(arg);
        }

        for (key, value) in spec.env {
            cmd = cmd.env(key, value);
        }

        cmd
    }
}

/// Render whole-archive / start-end group wrapping for the given linker
/// groups, erroring out where the target platform's linker can't express
/// the requested grouping.
fn link_group_flags(groups: &[LinkGroup], target_os: &str) -> Result<Vec<String>> {
    let mut flags = Vec::new();

    for group in groups {
        match group {
            LinkGroup::WholeArchive { libs } => match target_os {
                "macos" | "ios" => {
                    bail!(
                        "WholeArchive with library names not supported on macOS/iOS.\n\
                         Use explicit paths in ldflags instead:\n\
                           ldflags = [\"-Wl,-force_load,/path/to/libfoo.a\"]"
                    );
                }
                "windows" => {
                    bail!("WholeArchive not yet supported on Windows.");
                }
                _ => {
                    flags.push("-Wl,--whole-archive".to_string());
                    flags.extend(libs.iter().map(|lib| format!("-l{}", lib)));
                    flags.push("-Wl,--no-whole-archive".to_string());
                }
            },
            LinkGroup::StartEndGroup { libs } => match target_os {
                "macos" | "ios" | "windows" => {
                    bail!("StartEndGroup link group only supported on Linux/BSD with GNU ld.");
                }
                _ => {
                    flags.push("-Wl,--start-group".to_string());
                    flags.extend(libs.iter().map(|lib| format!("-l{}", lib)));
                    flags.push("-Wl,--end-group".to_string());
                }
            },
        }
    }

    Ok(flags)
}

/// Whether a compile worker should stop picking up new tasks: either a
/// peer has already failed, or cancellation was requested.
fn should_stop(failed: &AtomicBool, cancel: &dyn CancellationSource) -> bool {
    failed.load(Ordering::SeqCst) || cancel.is_cancelled()
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        + 2
}

fn quote_command(spec: &CommandSpec) -> String {
    let mut parts = vec![spec.program.display().to_string()];
    parts.extend(spec.args.iter().cloned());
    parts.join(" ")
}

fn split_link_flags(flags: &[String]) -> (Vec<String>, Vec<String>) {
    let mut libs = Vec::new();
    let mut extra = Vec::new();
    let mut iter = flags.iter().peekable();

    while let Some(flag) = iter.next() {
        if flag == "-framework" {
            if let Some(name) = iter.next() {
                extra.push(flag.clone());
                extra.push(name.clone());
            }
            continue;
        }

        if let Some(name) = flag.strip_prefix("-l") {
            if !name.is_empty() {
                libs.push(name.to_string());
            }
            continue;
        }

        if flag.ends_with(".lib")
            || flag.ends_with(".a")
            || flag.ends_with(".so")
            || flag.ends_with(".dylib")
            || flag.ends_with(".dll")
        {
            extra.push(flag.clone());
            continue;
        }

        extra.push(flag.clone());
    }

    (libs, extra)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_link_flags() {
        let flags = vec!["-lm".to_string(), "-framework".to_string(), "CoreFoundation".to_string()];
        let (libs, extra) = split_link_flags(&flags);
        assert_eq!(libs, vec!["m".to_string()]);
        assert_eq!(extra, vec!["-framework".to_string(), "CoreFoundation".to_string()]);
    }

    #[test]
    fn test_quote_command() {
        let spec = CommandSpec::new("gcc").arg("-c").arg("a.c");
        assert_eq!(quote_command(&spec), "gcc -c a.c");
    }

    #[test]
    fn test_link_group_flags_linux() {
        let groups = vec![LinkGroup::WholeArchive {
            libs: vec!["foo".to_string()],
        }];
        let flags = link_group_flags(&groups, "linux").unwrap();
        assert_eq!(
            flags,
            vec![
                "-Wl,--whole-archive".to_string(),
                "-lfoo".to_string(),
                "-Wl,--no-whole-archive".to_string(),
            ]
        );
    }

    #[test]
    fn test_link_group_flags_whole_archive_rejected_on_macos() {
        let groups = vec![LinkGroup::WholeArchive {
            libs: vec!["foo".to_string()],
        }];
        assert!(link_group_flags(&groups, "macos").is_err());
    }
}
