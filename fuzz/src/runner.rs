use std::time::{Duration, Instant};

use itertools::Itertools;
use rand::prelude::ThreadRng;

use crate::{utils, Arbitrary};

/// Run the fuzzer on some kind of sample
pub fn fuzz<A: Arbitrary>(iteration_limit: Option<usize>, config: A::Config) {
    Runner::<A>::new(config).run(iteration_limit);
}

/// A thread-local `Runner` for fuzz tests
#[derive(Debug, Clone)]
struct Runner<A: Arbitrary> {
    rng: ThreadRng,
    config: A::Config,

    // Stat printing state
    fuzz_start_time: Instant,
    elapsed_secs_for_last_print: u64,

    // Fuzzing loop state
    iteration_count: usize,
    total_edits: usize,
    total_time_checking: Duration,
}

impl<A: Arbitrary> Runner<A> {
    /// Create a `Runner` which hasn't run any fuzzing iterations.
    fn new(config: A::Config) -> Self {
        Self {
            rng: rand::thread_rng(),
            config,

            fuzz_start_time: Instant::now(),
            elapsed_secs_for_last_print: 0,

            iteration_count: 0,
            total_edits: 0,
            total_time_checking: Duration::ZERO,
        }
    }

    /// Run the mainloop of the fuzzer
    fn run(mut self, iteration_limit: Option<usize>) {
        loop {
            // Generate new sample
            let sample = A::gen(&self.config, &mut self.rng);

            if let Err(failure) = self.check(&sample) {
                let (shrunk_sample, failure) = self.shrink(sample, failure);
                dbg!(shrunk_sample);
                panic!("Check failed: {}", failure);
            }

            self.iteration_count += 1;
            let reached_iteration_limit =
                iteration_limit.map_or(false, |limit| self.iteration_count >= limit);

            // Print stats roughly every second, or when the test ends
            let elapsed_secs = self.fuzz_start_time.elapsed().as_secs();
            if elapsed_secs > self.elapsed_secs_for_last_print || reached_iteration_limit {
                self.elapsed_secs_for_last_print = elapsed_secs;
                println!(
                    "{} iters.  {} edits in {:?} = {} edits/s",
                    self.iteration_count,
                    utils::format_big_number(self.total_edits as f32),
                    self.total_time_checking,
                    utils::format_big_number(
                        self.total_edits as f32 / self.total_time_checking.as_secs_f32()
                    )
                );
            }
            // Exit loop if iteration limit is reached
            if reached_iteration_limit {
                return;
            }
        }
    }

    /// Shrink a failing sample until a minimal failing sample is found.  Every slightly smaller
    /// version of the sample is tried in turn; the first one which also fails becomes the new
    /// sample.  Once none of the smaller versions fail, the current sample is minimal.
    fn shrink(&mut self, mut sample: A, mut failure: String) -> (A, String) {
        println!("Shrinking...");
        'shrink: loop {
            let smaller_cases = sample.smaller_cases().collect_vec();
            for smaller_case in smaller_cases {
                if let Err(smaller_failure) = self.check(&smaller_case) {
                    sample = smaller_case;
                    failure = smaller_failure;
                    continue 'shrink;
                }
            }
            return (sample, failure);
        }
    }

    fn check(&mut self, sample: &A) -> Result<(), String> {
        let start = Instant::now();
        let result = sample.check();
        self.total_time_checking += start.elapsed();
        self.total_edits += result.as_ref().copied().unwrap_or(0);
        result.map(|_| ())
    }
}
