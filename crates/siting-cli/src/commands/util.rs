use anyhow::Result;
use rayon::ThreadPoolBuilder;
use siting_batch::SitingConfig;
use siting_cli::SitingArgs;

/// Size the global rayon pool; `0` means one thread per core.
pub fn configure_threads(threads: usize) {
    let count = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };
    let _ = ThreadPoolBuilder::new()
        .num_threads(count)
        .thread_name(|i| format!("siting-{i}"))
        .build_global();
}

/// Config file (if any) with command-line overrides applied.
pub fn resolve_config(args: &SitingArgs) -> Result<SitingConfig> {
    let mut config = match &args.config {
        Some(path) => SitingConfig::load_from(path)?,
        None => SitingConfig::default(),
    };
    if let Some(preset) = &args.preset {
        config.decay.preset = Some(preset.parse()?);
    }
    if let Some(bandwidth) = args.bandwidth {
        config.decay.bandwidth = Some(bandwidth);
    }
    if let Some(capture_range) = args.capture_range {
        config.decay.capture_range = Some(capture_range);
    }
    if let Some(min) = args.min_capacity {
        config.capacity.min = Some(min);
    }
    if let Some(max) = args.max_capacity {
        config.capacity.max = Some(max);
    }
    if let Some(threads) = args.threads {
        config.runner.threads = threads;
    }
    if args.save_intermediate {
        config.runner.save_intermediate = true;
    }
    Ok(config)
}
