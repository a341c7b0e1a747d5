use itertools::Itertools;
use number_prefix::NumberPrefix;
use rand::{prelude::SliceRandom, Rng};
use rand_distr::Distribution;

/// Generates a non-empty random string, made of `chars`, whose length follows `length_distr`
pub fn random_text(
    rng: &mut impl Rng,
    chars: &[char],
    length_distr: impl Distribution<u64>,
) -> String {
    let len = rng.sample(length_distr) as usize + 1;
    std::iter::repeat_with(|| *chars.choose(rng).unwrap())
        .take(len)
        .collect()
}

/// Number of [`char`]s in a string
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn format_big_number(num: f32) -> String {
    match NumberPrefix::decimal(num) {
        NumberPrefix::Standalone(n) => format!("{:.0}", n),
        NumberPrefix::Prefixed(prefix, n) => format!("{:.1}{}", n, prefix),
    }
}

/// Every way of removing exactly one element from `items`, removing later elements first
pub fn remove_one<T: Clone>(items: &[T]) -> impl Iterator<Item = Vec<T>> + '_ {
    (0..items.len()).rev().map(move |i| {
        items
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, x)| x.clone())
            .collect_vec()
    })
}
