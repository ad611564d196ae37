//! Gauss-Legendre quadrature rules in reference coordinates
//!
//! Only 2-point and 3-point per-axis rules are needed by the element
//! catalogue (exact for total per-axis degree 3 and 5 respectively), so the
//! 1D abscissae/weights below are the closed-form values rather than a
//! general root finder.

/// A tensor-product Gauss-Legendre rule on `[-1, 1]^dim`.
#[derive(Debug, Clone)]
pub struct GaussRule {
    /// Quadrature points, each of length `dim`.
    pub points: Vec<Vec<f64>>,
    /// Quadrature weights, one per point.
    pub weights: Vec<f64>,
}

impl GaussRule {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// 1D Gauss-Legendre abscissae and weights on `[-1, 1]`.
///
/// Supports `n` in `{1, 2, 3}`; these are the only orders the element
/// catalogue requires (`pExact` of 3 and 5).
fn gauss_legendre_1d(n: usize) -> (Vec<f64>, Vec<f64>) {
    match n {
        1 => (vec![0.0], vec![2.0]),
        2 => {
            let a = 1.0 / 3.0_f64.sqrt();
            (vec![-a, a], vec![1.0, 1.0])
        }
        3 => {
            let a = (3.0_f64 / 5.0).sqrt();
            (vec![-a, 0.0, a], vec![5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0])
        }
        _ => panic!("gauss_legendre_1d only supports n in {{1, 2, 3}}, got {n}"),
    }
}

/// Build a `dim`-dimensional tensor-product rule with `n` points per axis.
pub fn tensor_product_rule(dim: usize, n: usize) -> GaussRule {
    let (abscissae, weights) = gauss_legendre_1d(n);

    let mut points: Vec<Vec<f64>> = vec![vec![]];
    let mut rule_weights: Vec<f64> = vec![1.0];

    for _axis in 0..dim {
        let mut next_points = Vec::with_capacity(points.len() * n);
        let mut next_weights = Vec::with_capacity(points.len() * n);
        for (p, w) in points.iter().zip(rule_weights.iter()) {
            for (a, wa) in abscissae.iter().zip(weights.iter()) {
                let mut np = p.clone();
                np.push(*a);
                next_points.push(np);
                next_weights.push(w * wa);
            }
        }
        points = next_points;
        rule_weights = next_weights;
    }

    GaussRule {
        points,
        weights: rule_weights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrate_monomial(rule: &GaussRule, exponents: &[i32]) -> f64 {
        rule.points
            .iter()
            .zip(&rule.weights)
            .map(|(p, w)| {
                let monomial: f64 = p
                    .iter()
                    .zip(exponents)
                    .map(|(&x, &e)| x.powi(e))
                    .product();
                monomial * w
            })
            .sum()
    }

    fn exact_1d_monomial_integral(exponent: i32) -> f64 {
        if exponent % 2 == 1 {
            0.0
        } else {
            2.0 / (exponent as f64 + 1.0)
        }
    }

    #[test]
    fn two_point_rule_exact_to_degree_three() {
        let rule = tensor_product_rule(2, 2);
        for a in 0..=3 {
            let expected = exact_1d_monomial_integral(a) * exact_1d_monomial_integral(a);
            let got = integrate_monomial(&rule, &[a, a]);
            assert!((got - expected).abs() < 1e-10, "a={a} got={got} exp={expected}");
        }
    }

    #[test]
    fn two_point_rule_fails_at_degree_four() {
        let rule = tensor_product_rule(2, 2);
        let expected = exact_1d_monomial_integral(4) * exact_1d_monomial_integral(4);
        let got = integrate_monomial(&rule, &[4, 4]);
        assert!((got - expected).abs() > 1e-8);
    }

    #[test]
    fn three_point_rule_exact_to_degree_five() {
        let rule = tensor_product_rule(3, 3);
        for a in 0..=5 {
            let expected = exact_1d_monomial_integral(a).powi(1) * exact_1d_monomial_integral(a) * exact_1d_monomial_integral(a);
            let got = integrate_monomial(&rule, &[a, a, a]);
            assert!((got - expected).abs() < 1e-9, "a={a} got={got} exp={expected}");
        }
    }

    #[test]
    fn three_point_rule_fails_at_degree_six() {
        let rule = tensor_product_rule(3, 3);
        let expected = exact_1d_monomial_integral(6).powi(3);
        let got = integrate_monomial(&rule, &[6, 6, 6]);
        assert!((got - expected).abs() > 1e-8);
    }

    #[test]
    fn rule_sizes() {
        assert_eq!(tensor_product_rule(2, 2).len(), 4);
        assert_eq!(tensor_product_rule(2, 3).len(), 9);
        assert_eq!(tensor_product_rule(3, 2).len(), 8);
        assert_eq!(tensor_product_rule(3, 3).len(), 27);
    }
}
