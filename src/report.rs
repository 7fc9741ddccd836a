//! Progress/logger sink passed explicitly through the decomposer — no
//! process-wide singleton (Design Notes §9), unlike the teacher's
//! `Progress` struct which this one is otherwise styled on.

use std::time::Instant;

use indicatif::ProgressBar;
use indicatif::ProgressStyle;

/// Initializes terminal + file logging the way the teacher's `lib::init()`
/// does: a `TermLogger` at Info (Debug if `debug`) alongside a `WriteLogger`
/// at Debug writing into the output directory.
pub fn init_logging(output_directory: &std::path::Path, debug: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_directory)?;
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let term = simplelog::TermLogger::new(
        level,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config,
        std::fs::File::create(output_directory.join("decompose.log"))?,
    );
    simplelog::CombinedLogger::init(vec![term, file])?;
    Ok(())
}

/// A named phase of the decomposer, reported through the `log` crate and
/// (for interactive terminals) a spinner — mirrors `clustering::Progress`'s
/// tick-and-log cadence without owning any global state.
pub struct Reporter {
    phase: &'static str,
    bar: Option<ProgressBar>,
    begin: Instant,
}

impl Reporter {
    pub fn phase(phase: &'static str) -> Self {
        log::info!("phase: {phase}");
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {elapsed} ~ {msg}")
                .expect("static template is valid"),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(200));
        Self {
            phase,
            bar: Some(bar),
            begin: Instant::now(),
        }
    }

    pub fn update(&self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}: {message}", self.phase);
        if let Some(bar) = &self.bar {
            bar.set_message(message);
        }
    }

    pub fn finish(self) {
        let elapsed = self.begin.elapsed();
        log::info!("phase {} done in {elapsed:.2?}", self.phase);
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
