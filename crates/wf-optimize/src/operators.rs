//! Variation operators.

use rand::Rng;
use wf_core::Real;

/// Exchange the tails of two parents at `cut`.
///
/// Vectors shorter than two genes have no interior cut point and come back as
/// copies of their parents.
pub fn single_point_crossover(a: &[Real], b: &[Real], cut: usize) -> (Vec<Real>, Vec<Real>) {
    let len = a.len().min(b.len());
    if len < 2 {
        return (a.to_vec(), b.to_vec());
    }
    let cut = cut.clamp(1, len - 1);
    let mut first = Vec::with_capacity(a.len());
    first.extend_from_slice(&a[..cut]);
    first.extend_from_slice(&b[cut..]);
    let mut second = Vec::with_capacity(b.len());
    second.extend_from_slice(&b[..cut]);
    second.extend_from_slice(&a[cut..]);
    (first, second)
}

/// Uniform cut point in `[1, len - 1]`.
pub fn random_cut<R: Rng + ?Sized>(len: usize, rng: &mut R) -> usize {
    if len < 2 { 1 } else { rng.gen_range(1..len) }
}

/// Add an integer in `[-span, span]` to each gene with probability `rate`.
/// Returns the number of genes touched.
pub fn mutate<R: Rng + ?Sized>(genes: &mut [Real], rate: Real, span: u32, rng: &mut R) -> usize {
    if rate <= 0.0 {
        return 0;
    }
    let span = i64::from(span);
    let mut touched = 0;
    for gene in genes.iter_mut() {
        if rng.gen_bool(rate.min(1.0)) {
            *gene += rng.gen_range(-span..=span) as Real;
            touched += 1;
        }
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn crossover_swaps_tails() {
        let (c1, c2) = single_point_crossover(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0], 1);
        assert_eq!(c1, vec![1.0, 6.0, 7.0, 8.0]);
        assert_eq!(c2, vec![5.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn single_gene_parents_are_copied() {
        let (c1, c2) = single_point_crossover(&[1.0], &[2.0], 1);
        assert_eq!((c1, c2), (vec![1.0], vec![2.0]));
    }

    #[test]
    fn zero_rate_never_mutates() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut genes = vec![150.0; 32];
        assert_eq!(mutate(&mut genes, 0.0, 10, &mut rng), 0);
        assert!(genes.iter().all(|g| *g == 150.0));
    }

    #[test]
    fn full_rate_stays_within_span() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut genes = vec![150.0; 64];
        assert_eq!(mutate(&mut genes, 1.0, 10, &mut rng), 64);
        assert!(genes.iter().all(|g| (140.0..=160.0).contains(g) && g.fract() == 0.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn crossover_preserves_genes_per_position(
                pair in (2usize..16).prop_flat_map(|n| (
                    prop::collection::vec(-1.0e3..1.0e3f64, n),
                    prop::collection::vec(-1.0e3..1.0e3f64, n),
                    1..n,
                )),
            ) {
                let (a, b, cut) = pair;
                let (c1, c2) = single_point_crossover(&a, &b, cut);
                prop_assert_eq!(c1.len(), a.len());
                prop_assert_eq!(c2.len(), b.len());
                for i in 0..a.len() {
                    let mut parents = [a[i], b[i]];
                    let mut children = [c1[i], c2[i]];
                    parents.sort_by(Real::total_cmp);
                    children.sort_by(Real::total_cmp);
                    prop_assert_eq!(parents, children);
                }
                prop_assert_eq!(&c1[..cut], &a[..cut]);
                prop_assert_eq!(&c1[cut..], &b[cut..]);
            }

            #[test]
            fn cut_is_interior(len in 2usize..64, seed in any::<u64>()) {
                let mut rng = StdRng::seed_from_u64(seed);
                let cut = random_cut(len, &mut rng);
                prop_assert!(cut >= 1 && cut < len);
            }
        }
    }
}
