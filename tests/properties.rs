use proptest::prelude::*;
use strided_flip::{flip, flip_with, roll, rot90, FlipConfig, FlipStrategy, StridedArray};

/// A row-major array of up to 4 dims (extents may be 0) and one flip flag per dim.
fn gen_array_and_mask() -> impl Strategy<Value = (StridedArray<i32>, Vec<bool>)> {
    prop::collection::vec(0usize..=4, 1..=4).prop_flat_map(|dims| {
        let rank = dims.len();
        let len: usize = dims.iter().product();
        let array = StridedArray::from_vec((0..len as i32).collect(), &dims).unwrap();
        (Just(array), prop::collection::vec(any::<bool>(), rank))
    })
}

/// A row-major array of 2 to 4 non-empty dims and two distinct axes.
fn gen_array_and_plane() -> impl Strategy<Value = (StridedArray<i32>, usize, usize)> {
    prop::collection::vec(1usize..=4, 2..=4).prop_flat_map(|dims| {
        let rank = dims.len();
        let len: usize = dims.iter().product();
        let array = StridedArray::from_vec((0..len as i32).collect(), &dims).unwrap();
        (Just(array), 0..rank, 1..rank).prop_map(move |(a, d0, step)| (a, d0, (d0 + step) % rank))
    })
}

fn axes_of(mask: &[bool]) -> Vec<isize> {
    mask.iter()
        .enumerate()
        .filter(|(_, on)| **on)
        .map(|(d, _)| d as isize)
        .collect()
}

proptest! {
    #[test]
    fn strategies_agree((a, mask) in gen_array_and_mask(), grain in 1usize..64) {
        let dims = axes_of(&mask);
        let direct = FlipConfig::default()
            .with_strategy(FlipStrategy::Direct)
            .with_direct_grain(grain);
        let index = FlipConfig::default()
            .with_strategy(FlipStrategy::Index)
            .with_index_grain(grain);
        let x = flip_with(&a.view(), &dims, &direct).unwrap();
        let y = flip_with(&a.view(), &dims, &index).unwrap();
        prop_assert_eq!(x.dims(), a.dims());
        prop_assert_eq!(x.to_vec(), y.to_vec());
    }

    #[test]
    fn flip_is_an_involution((a, mask) in gen_array_and_mask()) {
        let dims = axes_of(&mask);
        let once = flip(&a.view(), &dims).unwrap();
        let twice = flip(&once.view(), &dims).unwrap();
        prop_assert_eq!(twice.to_vec(), a.to_vec());
    }

    #[test]
    fn successive_flips_compose(
        (a, first) in gen_array_and_mask(),
        seed in any::<u64>(),
    ) {
        let second: Vec<bool> = (0..first.len()).map(|d| seed >> d & 1 == 1).collect();
        let combined: Vec<bool> = first.iter().zip(&second).map(|(x, y)| x ^ y).collect();
        let step = flip(&a.view(), &axes_of(&first)).unwrap();
        let step = flip(&step.view(), &axes_of(&second)).unwrap();
        let direct = flip(&a.view(), &axes_of(&combined)).unwrap();
        prop_assert_eq!(step.to_vec(), direct.to_vec());
    }

    #[test]
    fn four_quarter_turns_are_identity((a, d0, d1) in gen_array_and_plane()) {
        let plane = [d0 as isize, d1 as isize];
        let mut r = a.clone();
        for _ in 0..4 {
            let next = rot90(&r.view(), 1, &plane).unwrap();
            r = next;
        }
        prop_assert_eq!(r.dims(), a.dims());
        prop_assert_eq!(r.to_vec(), a.to_vec());
    }

    #[test]
    fn rotation_undoes_its_inverse((a, d0, d1) in gen_array_and_plane(), k in -9i64..9) {
        let plane = [d0 as isize, d1 as isize];
        let r = rot90(&a.view(), k, &plane).unwrap();
        let back = rot90(&r.view(), -k, &plane).unwrap();
        prop_assert_eq!(back.dims(), a.dims());
        prop_assert_eq!(back.to_vec(), a.to_vec());
    }

    #[test]
    fn flattened_roll_rotates_elements((a, _) in gen_array_and_mask(), shift in -20i64..20) {
        let rolled = roll(&a.view(), &[shift], &[]).unwrap();
        prop_assert_eq!(rolled.dims(), a.dims());
        let mut expected = a.to_vec();
        if !expected.is_empty() {
            let n = expected.len() as i64;
            expected.rotate_right(shift.rem_euclid(n) as usize);
        }
        prop_assert_eq!(rolled.to_vec(), expected);
    }

    #[test]
    fn roll_then_unroll_is_identity((a, mask) in gen_array_and_mask(), shift in -20i64..20) {
        let dims = axes_of(&mask);
        prop_assume!(!dims.is_empty());
        let shifts = vec![shift; dims.len()];
        let back_shifts = vec![-shift; dims.len()];
        let rolled = roll(&a.view(), &shifts, &dims).unwrap();
        let back = roll(&rolled.view(), &back_shifts, &dims).unwrap();
        prop_assert_eq!(back.to_vec(), a.to_vec());
    }
}
