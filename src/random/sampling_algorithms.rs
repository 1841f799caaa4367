//! Uniform sampling without replacement from containers that can be iterated
//! but not necessarily indexed.

use crate::rand::seq::index::sample as choose_range;
use crate::rand::Rng;

/// Samples up to `requested` elements uniformly without replacement from an
/// iterator of known length. Elements come back in iteration order. If fewer
/// than `requested` elements exist, all of them are returned.
pub fn sample_multiple_from_known_length<I, R, T>(rng: &mut R, iter: I, requested: usize) -> Vec<T>
where
    R: Rng,
    I: ExactSizeIterator<Item = T>,
{
    let len = iter.len();
    if requested >= len {
        return iter.collect();
    }
    if requested == 0 {
        return Vec::new();
    }
    let mut indexes = choose_range(rng, len, requested).into_vec();
    indexes.sort_unstable();

    let mut selected = Vec::with_capacity(requested);
    let mut wanted = indexes.into_iter().peekable();
    for (idx, item) in iter.enumerate() {
        match wanted.peek() {
            Some(&next) if next == idx => {
                selected.push(item);
                wanted.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::HashSet;

    #[test]
    fn samples_without_duplicates() {
        let data: Vec<u32> = (0..1000).collect();
        let mut rng = SmallRng::seed_from_u64(42);
        let sample = sample_multiple_from_known_length(&mut rng, data.iter(), 100);

        assert_eq!(sample.len(), 100);
        let unique: HashSet<_> = sample.iter().collect();
        assert_eq!(unique.len(), sample.len());
        // Iteration order is preserved.
        assert!(sample.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn requesting_more_than_available_returns_everything() {
        let mut rng = SmallRng::seed_from_u64(1);
        let sample = sample_multiple_from_known_length(&mut rng, [1, 2, 3].into_iter(), 10);
        assert_eq!(sample, vec![1, 2, 3]);
    }

    #[test]
    fn requesting_nothing() {
        let mut rng = SmallRng::seed_from_u64(1);
        let sample = sample_multiple_from_known_length(&mut rng, [1, 2, 3].into_iter(), 0);
        assert!(sample.is_empty());
    }

    #[test]
    fn every_element_can_be_chosen() {
        let mut seen = [false; 10];
        for seed in 0..200 {
            let mut rng = SmallRng::seed_from_u64(seed);
            for i in sample_multiple_from_known_length(&mut rng, 0..10usize, 2) {
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }
}
