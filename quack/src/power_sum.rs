use crate::arithmetic::{self, CoefficientVector, ModularArithmetic, ModularInteger};
use crate::precompute;
use crate::Quack;

/// 32-bit power sum quACK.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PowerSumQuackU32 {
    power_sums: Vec<ModularInteger>,
    last_value: Option<ModularInteger>,
    count: u32,
}

/// A quACK represented by a threshold number of power sums.
///
/// The power sum quACK is useful for decoding a set difference of elements
/// when the number of elements in the set difference is comparatively small
/// to the number of elements in either set. It is also efficient to insert
/// elements in the power sum quACK. The tradeoff is that it becomes impossible
/// to decode the quACK when the number of elements in the quACK exceeds a
/// pre-determined threshold. The number of bytes needed to transmit the quACK
/// over the wire is proportional to this threshold.
///
/// The underlying representation of a power sum quACK is a `threshold` number
/// of power sums. If `X` is the multiset of elements in the quACK, then the
/// `i`-th power sum is just the sum of `x^i` for all `x` in `X`.
pub trait PowerSumQuack: Quack {
    /// Convert the `n` modular power sums that represent the elements in the
    /// quACK to a degree-`n` monic polynomial in the same field. The
    /// polynomial is represented by a vector of coefficients (the leading
    /// coefficient of 1 is elided), calculated using
    /// [Newton's identities](https://en.wikipedia.org/wiki/Newton%27s_identities).
    ///
    /// # Examples
    ///
    /// ```
    /// use quack::{Quack, PowerSumQuack, PowerSumQuackU32};
    /// use quack::arithmetic::ModularInteger;
    ///
    /// const THRESHOLD: usize = 20;
    /// const ROOT1: u32 = 10;
    /// const ROOT2: u32 = 12;
    ///
    /// // Polynomial with degree 1
    /// let mut quack = PowerSumQuackU32::new(THRESHOLD);
    /// quack.insert(ROOT1);
    /// let coeffs = quack.to_coeffs(); // x - 10
    /// assert_eq!(coeffs.len(), 1);
    ///
    /// // Polynomial with degree 2
    /// quack.insert(ROOT2);
    /// let coeffs = quack.to_coeffs(); // x^2 - 22x + 120
    /// assert_eq!(coeffs.len(), 2);
    /// ```
    fn to_coeffs(&self) -> CoefficientVector;

    /// Similar to [to_coeffs](PowerSumQuack::to_coeffs) but reuses the same
    /// vector allocation to return the coefficients.
    fn to_coeffs_preallocated(&self, coeffs: &mut CoefficientVector);

    /// Decode the elements of the log that are in the quACK.
    ///
    /// This method evaluates the polynomial derived from the power sums in
    /// the quACK at each of the candidate roots in the log, returning the
    /// roots. If a root appears more than once in the log, it will appear
    /// the same number of times in the returned roots. Note that the
    /// decoding method does not consider the root multiplicity in the
    /// polynomial. If the log is incomplete, there will be fewer roots
    /// returned than the actual number of elements represented by the quACK.
    fn decode_with_log(&self, log: &[Self::Element]) -> Vec<Self::Element>;
}

impl Quack for PowerSumQuackU32 {
    type Element = u32;

    fn new(threshold: usize) -> Self {
        Self {
            power_sums: (0..threshold).map(|_| ModularInteger::zero()).collect(),
            last_value: None,
            count: 0,
        }
    }

    fn threshold(&self) -> usize {
        self.power_sums.len()
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn last_value(&self) -> Option<Self::Element> {
        self.last_value.map(|value| value.value())
    }

    fn insert(&mut self, value: Self::Element) {
        let size = self.power_sums.len();
        let x = ModularInteger::new(value);
        let mut y = x;
        for i in 0..size.saturating_sub(1) {
            self.power_sums[i].add_assign(y);
            y.mul_assign(x);
        }
        if size > 0 {
            self.power_sums[size - 1].add_assign(y);
        }
        self.count = self.count.wrapping_add(1);
        self.last_value = Some(x);
    }

    fn remove(&mut self, value: Self::Element) {
        let size = self.power_sums.len();
        let x = ModularInteger::new(value);
        let mut y = x;
        for i in 0..size.saturating_sub(1) {
            self.power_sums[i].sub_assign(y);
            y.mul_assign(x);
        }
        if size > 0 {
            self.power_sums[size - 1].sub_assign(y);
        }
        self.count = self.count.wrapping_sub(1);
        if let Some(last_value) = self.last_value {
            if last_value.value() == value {
                self.last_value = None;
            }
        }
    }

    fn sub_assign(&mut self, rhs: &Self) {
        assert_eq!(
            self.threshold(),
            rhs.threshold(),
            "expected subtracted quacks to have the same threshold"
        );
        for (i, sum) in self.power_sums.iter_mut().enumerate() {
            sum.sub_assign(rhs.power_sums[i]);
        }
        self.count = self.count.wrapping_sub(rhs.count);
        self.last_value = None;
    }

    fn sub(&self, rhs: &Self) -> Self {
        let threshold = std::cmp::min(self.threshold(), rhs.threshold());
        let power_sums = self
            .power_sums
            .iter()
            .zip(rhs.power_sums.iter())
            .take(threshold)
            .map(|(lhs, rhs)| lhs.sub(*rhs))
            .collect();
        Self {
            power_sums,
            last_value: None,
            count: self.count.wrapping_sub(rhs.count),
        }
    }
}

impl PowerSumQuackU32 {
    /// The raw power-sum components, for wire encoding.
    pub(crate) fn power_sums_slice(&self) -> &[ModularInteger] {
        &self.power_sums
    }

    /// Reconstructs a quACK from its wire-decoded parts. `last_received_id`
    /// is `0` when the aggregator has not yet observed any packet for this
    /// source; callers distinguish that case with `count`.
    pub(crate) fn from_wire_parts(
        count: u32,
        last_received_id: u32,
        power_sums: Vec<ModularInteger>,
    ) -> Self {
        Self {
            power_sums,
            last_value: Some(ModularInteger::new(last_received_id)),
            count,
        }
    }
}

impl PowerSumQuack for PowerSumQuackU32 {
    fn to_coeffs(&self) -> CoefficientVector {
        let mut coeffs = (0..self.count())
            .map(|_| ModularInteger::zero())
            .collect::<Vec<_>>();
        self.to_coeffs_preallocated(&mut coeffs);
        coeffs
    }

    fn to_coeffs_preallocated(&self, coeffs: &mut CoefficientVector) {
        if coeffs.is_empty() {
            return;
        }
        coeffs[0] = self.power_sums[0].neg();
        for i in 1..coeffs.len() {
            for j in 0..i {
                coeffs[i] = coeffs[i].sub(self.power_sums[j].mul(coeffs[i - j - 1]));
            }
            coeffs[i].sub_assign(self.power_sums[i]);
            coeffs[i].mul_assign(precompute::inverse_of(i));
        }
    }

    fn decode_with_log(&self, log: &[Self::Element]) -> Vec<Self::Element> {
        if self.count() == 0 {
            return vec![];
        }
        let coeffs = self.to_coeffs();
        log.iter()
            .filter(|&&x| arithmetic::eval(&coeffs, x).value() == 0)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const THRESHOLD: usize = 3;

    #[test]
    fn test_quack_constructor() {
        let quack = PowerSumQuackU32::new(THRESHOLD);
        assert_eq!(quack.threshold(), THRESHOLD);
        assert_eq!(quack.count(), 0);
        assert_eq!(quack.last_value(), None);
    }

    #[test]
    fn test_quack_insert_and_remove() {
        let mut quack = PowerSumQuackU32::new(THRESHOLD);
        quack.insert(10);
        assert_eq!(quack.count(), 1);
        assert_eq!(quack.last_value(), Some(10));
        quack.insert(20);
        quack.insert(30);
        assert_eq!(quack.count(), 3);
        assert_eq!(quack.last_value(), Some(30));
        quack.remove(10);
        assert_eq!(quack.count(), 2);
        assert_eq!(quack.last_value(), Some(30));
        quack.remove(30);
        assert_eq!(quack.count(), 1);
        assert_eq!(quack.last_value(), None);
    }

    #[test]
    fn test_quack_to_coeffs_empty() {
        let quack = PowerSumQuackU32::new(THRESHOLD);
        assert_eq!(quack.to_coeffs(), CoefficientVector::new());
        let mut coeffs = vec![];
        quack.to_coeffs_preallocated(&mut coeffs);
        assert_eq!(coeffs, CoefficientVector::new());
    }

    #[test]
    fn test_quack_to_coeffs_small() {
        const R1: u32 = 1;
        const R2: u32 = 2;

        let mut quack = PowerSumQuackU32::new(THRESHOLD);
        quack.insert(R1);
        quack.insert(R2);
        let expected = vec![
            ModularInteger::new(R1 + R2).neg(),
            ModularInteger::new(R1 * R2),
        ]; // x^2 - 3x + 2

        assert_eq!(quack.to_coeffs(), expected);
        let mut coeffs = (0..quack.count()).map(|_| ModularInteger::zero()).collect();
        quack.to_coeffs_preallocated(&mut coeffs);
        assert_eq!(coeffs, expected);
    }

    #[test]
    fn test_quack_to_coeffs_big() {
        const R1: u64 = 3616712547;
        const R2: u64 = 2333013068;
        const R3: u64 = 2234311686;
        let modulus = ModularInteger::modulus_big();

        let mut quack = PowerSumQuackU32::new(THRESHOLD);
        quack.insert(R1 as u32);
        quack.insert(R2 as u32);
        quack.insert(R3 as u32);
        let expected = vec![
            ModularInteger::new(((R1 + R2 + R3) % modulus) as u32).neg(),
            ModularInteger::new(((R1 * R2 % modulus + R2 * R3 + R1 * R3) % modulus) as u32),
            ModularInteger::new(((((R1 * R2) % modulus) * R3) % modulus) as u32).neg(),
        ];

        assert_eq!(quack.to_coeffs(), expected);
        let mut coeffs = (0..quack.count()).map(|_| ModularInteger::zero()).collect();
        quack.to_coeffs_preallocated(&mut coeffs);
        assert_eq!(coeffs, expected);
    }

    #[test]
    fn test_decode_empty() {
        let quack = PowerSumQuackU32::new(THRESHOLD);
        assert_eq!(quack.decode_with_log(&[]), vec![]);
        assert_eq!(quack.decode_with_log(&[1]), vec![]);
    }

    #[test]
    fn test_insert_and_decode() {
        const R1: u32 = 3616712547;
        const R2: u32 = 2333013068;
        const R3: u32 = 2234311686;
        const R4: u32 = 448751902;
        const R5: u32 = 918748965;

        let mut quack = PowerSumQuackU32::new(THRESHOLD);
        quack.insert(R1);
        quack.insert(R2);
        quack.insert(R3);

        // different orderings; decode_with_log preserves log order
        assert_eq!(quack.decode_with_log(&[R1, R2, R3]), vec![R1, R2, R3]);
        assert_eq!(quack.decode_with_log(&[R3, R1, R2]), vec![R3, R1, R2]);

        // one extra element in log
        assert_eq!(quack.decode_with_log(&[R1, R2, R3, R4]), vec![R1, R2, R3]);
        assert_eq!(quack.decode_with_log(&[R1, R4, R2, R3]), vec![R1, R2, R3]);
        assert_eq!(quack.decode_with_log(&[R4, R1, R2, R3]), vec![R1, R2, R3]);

        // two extra elements in log
        assert_eq!(
            quack.decode_with_log(&[R1, R5, R2, R3, R4]),
            vec![R1, R2, R3]
        );

        // not all roots are in log
        assert_eq!(quack.decode_with_log(&[R1, R2]), vec![R1, R2]);
        assert_eq!(quack.decode_with_log(&[]), vec![]);
        assert_eq!(quack.decode_with_log(&[R1, R2, R4]), vec![R1, R2]);
    }

    #[test]
    fn test_remove_and_decode() {
        const R1: u32 = 3616712547;
        const R2: u32 = 2333013068;
        const R3: u32 = 2234311686;
        const R4: u32 = 448751902;
        const R5: u32 = 918748965;

        let mut quack = PowerSumQuackU32::new(THRESHOLD);
        quack.insert(R5);
        quack.insert(R4);
        quack.insert(R3);
        quack.insert(R2);
        quack.insert(R1);
        quack.remove(R5);
        quack.remove(R4);

        assert_eq!(quack.decode_with_log(&[R1, R2, R3]), vec![R1, R2, R3]);
        assert_eq!(
            quack.decode_with_log(&[R1, R5, R2, R3, R4]),
            vec![R1, R2, R3]
        );
    }

    #[test]
    fn test_decode_with_multiplicity() {
        const R1: u32 = 10;
        const R2: u32 = 20;

        let mut quack = PowerSumQuackU32::new(THRESHOLD);
        quack.insert(R1);
        quack.insert(R1);

        assert_eq!(quack.decode_with_log(&[R1, R1]), vec![R1, R1]);
        assert_eq!(quack.decode_with_log(&[R1]), vec![R1]);
        assert_eq!(quack.decode_with_log(&[R1, R1, R1]), vec![R1, R1, R1]);
        assert_eq!(quack.decode_with_log(&[R1, R1, R2]), vec![R1, R1]);
        assert_eq!(quack.decode_with_log(&[R2, R1, R2]), vec![R1]);
    }

    #[test]
    fn test_subtract_quacks_with_zero_difference() {
        let mut q1 = PowerSumQuackU32::new(THRESHOLD);
        q1.insert(1);
        q1.insert(2);
        q1.insert(3);
        q1.insert(4);
        q1.insert(5);

        let quack = q1.sub(&q1);
        assert_eq!(quack.threshold(), THRESHOLD);
        assert_eq!(quack.count(), 0);
        assert_eq!(quack.last_value(), None);
        assert_eq!(quack.to_coeffs(), CoefficientVector::new());
    }

    #[test]
    fn test_subtract_quacks_with_nonzero_difference() {
        let mut q1 = PowerSumQuackU32::new(THRESHOLD);
        q1.insert(1);
        q1.insert(2);
        q1.insert(3);
        q1.insert(4);
        q1.insert(5);

        let mut q2 = PowerSumQuackU32::new(THRESHOLD);
        q2.insert(1);
        q2.insert(2);

        let quack = q1.sub(&q2);
        assert_eq!(quack.threshold(), THRESHOLD);
        assert_eq!(quack.count(), 3);
        assert_eq!(quack.last_value(), None);
        assert_eq!(quack.to_coeffs().len(), 3);
        assert_eq!(quack.decode_with_log(&[1, 2, 3, 4, 5]), vec![3, 4, 5]);
    }

    #[test]
    fn test_subtract_quacks_with_different_threshold_lt() {
        let mut q1 = PowerSumQuackU32::new(THRESHOLD);
        q1.insert(1);
        q1.insert(2);
        q1.insert(3);
        q1.insert(4);
        q1.insert(5);

        let mut q2 = PowerSumQuackU32::new(THRESHOLD + 1);
        q2.insert(1);
        q2.insert(2);

        let quack = q1.sub(&q2);
        assert_eq!(quack.threshold(), THRESHOLD);
        assert_eq!(quack.count(), 3);
        assert_eq!(quack.last_value(), None);
        assert_eq!(quack.to_coeffs().len(), 3);
        assert_eq!(quack.decode_with_log(&[1, 2, 3, 4, 5]), vec![3, 4, 5]);
    }

    #[test]
    fn test_subtract_quacks_with_different_threshold_gt() {
        let mut q1 = PowerSumQuackU32::new(THRESHOLD + 1);
        q1.insert(1);
        q1.insert(2);
        q1.insert(3);
        q1.insert(4);
        q1.insert(5);

        let mut q2 = PowerSumQuackU32::new(THRESHOLD);
        q2.insert(1);
        q2.insert(2);

        let quack = q1.sub(&q2);
        assert_eq!(quack.threshold(), THRESHOLD);
        assert_eq!(quack.count(), 3);
        assert_eq!(quack.last_value(), None);
        assert_eq!(quack.to_coeffs().len(), 3);
        assert_eq!(quack.decode_with_log(&[1, 2, 3, 4, 5]), vec![3, 4, 5]);
    }

    #[test]
    fn test_zero_identifier_is_absorbing_element() {
        // 0 contributes 0 to every power sum, so inserting it changes only
        // `count` and `last_value`, never the decodable polynomial's roots
        // for nonzero candidates.
        let mut quack = PowerSumQuackU32::new(THRESHOLD);
        quack.insert(0);
        assert_eq!(quack.count(), 1);
        assert_eq!(quack.to_coeffs(), vec![ModularInteger::zero()]);
        assert_eq!(quack.decode_with_log(&[0]), vec![0]);
    }

    // Generated-input coverage for the decode law in spec §8: for random A, B
    // with |A \ B| <= threshold, decoding the difference quACK against a log
    // of A yields exactly A \ B.
    #[test]
    fn test_decode_with_log_on_random_sets() {
        use rand::seq::SliceRandom;
        use rand::Rng;

        const LOCAL_THRESHOLD: usize = 20;
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let n = rng.gen_range(10..100);
            let a: Vec<u32> = (0..n).map(|_| rng.gen_range(1..u32::MAX)).collect();
            let num_dropped = rng.gen_range(0..=LOCAL_THRESHOLD.min(a.len()));
            let mut b = a.clone();
            b.shuffle(&mut rng);
            b.truncate(a.len() - num_dropped);

            let mut quack_a = PowerSumQuackU32::new(LOCAL_THRESHOLD);
            for &x in &a {
                quack_a.insert(x);
            }
            let mut quack_b = PowerSumQuackU32::new(LOCAL_THRESHOLD);
            for &x in &b {
                quack_b.insert(x);
            }

            let difference = quack_a.sub(&quack_b);
            let mut dropped: Vec<u32> = a
                .iter()
                .copied()
                .filter(|x| !b.contains(x))
                .collect();
            let mut decoded = difference.decode_with_log(&a);
            dropped.sort_unstable();
            decoded.sort_unstable();
            assert_eq!(decoded, dropped);
        }
    }

    #[test]
    fn test_power_sums_are_insertion_order_independent() {
        use rand::seq::SliceRandom;
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let ids: Vec<u32> = (0..30).map(|_| rng.gen_range(1..u32::MAX)).collect();

        let mut in_order = PowerSumQuackU32::new(THRESHOLD + 27);
        for &id in &ids {
            in_order.insert(id);
        }

        let mut shuffled_ids = ids.clone();
        shuffled_ids.shuffle(&mut rng);
        let mut shuffled = PowerSumQuackU32::new(THRESHOLD + 27);
        for &id in &shuffled_ids {
            shuffled.insert(id);
        }

        assert_eq!(in_order, shuffled);
    }
}
