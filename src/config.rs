//! A small, ambient configuration type, mirroring `whitebox_common::configs::Configs` but
//! scoped down to what the core algorithms actually consult: a worker-thread cap and a
//! verbosity flag for progress output. Unlike `whitebox_common::configs::Configs`, this crate
//! does no file I/O of its own (no `settings.json`) since that belongs to the CLI/runner layer,
//! which this crate does not own.

/// Caps the number of worker threads used by the row-parallel passes of [`crate::d8`] and
/// [`crate::terrain`]. `max_procs = None` (the default) uses every available core, the way
/// WhiteboxTools' own tools behave when `settings.json` has no override.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub max_procs: Option<usize>,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max_procs: None,
            verbose: false,
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Builds a scoped rayon thread pool honoring `max_procs`, falling back to rayon's own
    /// default (all cores) if the pool cannot be constructed.
    pub(crate) fn thread_pool(&self) -> rayon::ThreadPool {
        let num_procs = self.max_procs.unwrap_or_else(num_cpus::get).max(1);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_procs)
            .build()
            .unwrap_or_else(|_| rayon::ThreadPoolBuilder::new().build().unwrap())
    }
}
