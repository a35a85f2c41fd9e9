//! Build executor with progress reporting.

use std::time::Instant;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::context::BuildContext;
use crate::builder::native::NativeBuilder;
use crate::builder::plan::{Artifact, BuildPlan};
use crate::util::cancel::{CancellationSource, NeverCancelled};

/// Build executor with progress tracking.
pub struct BuildExecutor<'a> {
    ctx: &'a BuildContext,
    verbose: bool,
    cancel: &'a dyn CancellationSource,
}

impl<'a> BuildExecutor<'a> {
    /// Create a new build executor.
    pub fn new(ctx: &'a BuildContext) -> Self {
        BuildExecutor {
            ctx,
            verbose: false,
            cancel: &NeverCancelled,
        }
    }

    /// Enable verbose output.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Poll `cancel` between dispatched compile and link tasks.
    pub fn with_cancellation(mut self, cancel: &'a dyn CancellationSource) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute a build plan with progress reporting.
    pub fn execute(&self, plan: &BuildPlan, jobs: Option<usize>) -> Result<Vec<Artifact>> {
        let start = Instant::now();

        // Show build info
        if self.verbose {
            eprintln!("   Compiling {} file(s)", plan.compile_count());
            eprintln!("     Linking {} target(s)", plan.link_count());
        }

        // Create progress bar
        let total = plan.compile_count() + plan.link_count();
        let pb = if !self.verbose && total > 1 {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        // Execute build
        let db_path = self.ctx.output_dir.join("fingerprints.db");
        let mut builder = NativeBuilder::new(self.ctx, &db_path)?.with_cancellation(self.cancel);
        let on_step: Option<Box<dyn Fn() + Send + Sync>> = pb
            .as_ref()
            .map(|pb| -> Box<dyn Fn() + Send + Sync> { Box::new({
                let pb = pb.clone();
                move || pb.inc(1)
            }) });
        if let Some(cb) = &on_step {
            builder = builder.with_progress(cb.as_ref());
        }
        let artifacts = builder.execute(plan, jobs)?;

        // Finish progress
        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }

        let elapsed = start.elapsed();
        eprintln!(
            "    Finished {} target(s) in {:.2}s",
            artifacts.len(),
            elapsed.as_secs_f64()
        );

        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn on_step_callback_fires_once_per_completed_step() {
        let count = AtomicUsize::new(0);
        let cb = || {
            count.fetch_add(1, Ordering::SeqCst);
        };
        cb();
        cb();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
