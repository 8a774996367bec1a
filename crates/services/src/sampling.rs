//! Uniform sampling helpers.
//!
//! Every random choice in a session goes through `SliceRandom::shuffle`
//! (Fisher-Yates), so samples are unbiased permutations of the pool.

use rand::Rng;
use rand::seq::SliceRandom;

use drill_core::grading::normalize;

/// Up to `count` distinct entries of `pool`, in random order.
pub fn sample<T: Clone, R: Rng + ?Sized>(pool: &[T], count: usize, rng: &mut R) -> Vec<T> {
    let mut picked = pool.to_vec();
    picked.shuffle(rng);
    picked.truncate(count);
    picked
}

/// Up to `count` wrong options drawn from `candidates`.
///
/// Candidates equal to `correct` (after normalization) and duplicates are
/// dropped first, so the options shown are always pairwise distinct.
pub fn distractors<'a, R: Rng + ?Sized>(
    correct: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let correct = normalize(correct);
    let mut seen = vec![correct];
    let mut unique = Vec::new();
    for candidate in candidates {
        let key = normalize(candidate);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        unique.push(candidate.to_owned());
    }
    unique.shuffle(rng);
    unique.truncate(count);
    unique
}

/// The correct answer mixed into its distractors at a random position.
pub fn options_with<R: Rng + ?Sized>(
    correct: &str,
    mut distractors: Vec<String>,
    rng: &mut R,
) -> Vec<String> {
    distractors.push(correct.to_owned());
    distractors.shuffle(rng);
    distractors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn sample_never_repeats_and_caps_at_pool_size() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool: Vec<u32> = (0..8).collect();

        let mut picked = sample(&pool, 5, &mut rng);
        assert_eq!(picked.len(), 5);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 5);

        assert_eq!(sample(&pool, 25, &mut rng).len(), 8);
        assert!(sample::<u32, _>(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn distractors_exclude_correct_and_duplicates() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = ["книга", "Книга", "стол", "стол ", "дом", "окно"];
        let picked = distractors("книга", candidates, 3, &mut rng);

        assert_eq!(picked.len(), 3);
        assert!(!picked.iter().any(|option| normalize(option) == "книга"));
        let mut keys: Vec<String> = picked.iter().map(|o| normalize(o)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn options_contain_correct_exactly_once() {
        let mut rng = StdRng::seed_from_u64(3);
        let options = options_with("gato", vec!["perro".into(), "casa".into()], &mut rng);
        assert_eq!(options.len(), 3);
        assert_eq!(options.iter().filter(|o| *o == "gato").count(), 1);
    }
}
