//! Automated random testing of snipsync's edit routing.  Random snippets are expanded into a
//! buffer, random edits are made to them, and after every edit the tree is checked against the
//! buffer.

mod runner;
mod session;
mod utils;

use std::fmt::Debug;

use rand::Rng;

fn main() {
    session::fuzz(Some(10_000));
}

pub trait Arbitrary: Sized + Clone + Debug {
    /// Configuration parameters passed into the [`runner::fuzz`] function
    type Config: Default;

    /// Create a new sample to test
    fn gen(config: &Self::Config, rng: &mut impl Rng) -> Self;
    /// Run this sample, returning how many edits it made or a description of what went wrong
    fn check(&self) -> Result<usize, String>;
    /// Slightly smaller versions of this sample, which are tried whilst shrinking a failing sample
    fn smaller_cases(&self) -> Box<dyn Iterator<Item = Self> + '_>;
}
