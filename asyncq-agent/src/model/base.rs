//! Multilayer perceptron Q-network.
use super::MlpConfig;
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Axis, Ix1, Ix2};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Multilayer perceptron with ReLU activations between layers.
///
/// Parameters are stored as an ordered, flat list of tensors
/// `[w0, b0, w1, b1, ..]`. The global and target parameter sets use the
/// same shapes and ordering, so a worker's local copy synchronizes by
/// assigning tensor by tensor.
pub struct Mlp {
    config: MlpConfig,
    params: Vec<ArrayD<f32>>,
}

impl Mlp {
    /// Constructs the network with uniformly initialized weights and zero
    /// biases.
    pub fn build(config: MlpConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut dims = vec![config.in_dim];
        dims.extend(config.units.iter().copied());
        dims.push(config.out_dim);

        let mut params = Vec::with_capacity(2 * (dims.len() - 1));
        for pair in dims.windows(2) {
            let (in_dim, out_dim) = (pair[0], pair[1]);
            let bound = 1.0 / (in_dim as f32).sqrt();
            let w = Array2::from_shape_fn((out_dim, in_dim), |_| rng.gen_range(-bound..bound));
            params.push(w.into_dyn());
            params.push(Array1::<f32>::zeros(out_dim).into_dyn());
        }
        Self { config, params }
    }

    /// Flat parameter list `[w0, b0, w1, b1, ..]`.
    pub fn params(&self) -> &[ArrayD<f32>] {
        &self.params
    }

    /// Mutable access to the flat parameter list.
    pub fn params_mut(&mut self) -> &mut [ArrayD<f32>] {
        &mut self.params
    }

    /// The number of layers.
    fn n_layers(&self) -> usize {
        self.params.len() / 2
    }

    fn weight(&self, layer: usize) -> ArrayView2<f32> {
        self.params[2 * layer]
            .view()
            .into_dimensionality::<Ix2>()
            .unwrap()
    }

    fn bias(&self, layer: usize) -> ArrayView1<f32> {
        self.params[2 * layer + 1]
            .view()
            .into_dimensionality::<Ix1>()
            .unwrap()
    }

    /// Action-value estimates for a single observation.
    pub fn forward(&self, obs: &Array1<f32>) -> Array1<f32> {
        let n_layers = self.n_layers();
        let mut h = obs.clone();
        for l in 0..n_layers {
            let mut z = self.weight(l).dot(&h) + self.bias(l);
            if l + 1 < n_layers {
                z.mapv_inplace(|v| v.max(0.0));
            }
            h = z;
        }
        h
    }

    /// Gradients of the squared error between the chosen-action value
    /// estimates and the given returns, with respect to the parameters.
    ///
    /// Returns the gradient list, aligned with [`Mlp::params`], and the
    /// mean loss over the batch.
    pub fn gradients(
        &self,
        obs: &[Array1<f32>],
        actions: &[usize],
        returns: &[f32],
    ) -> (Vec<ArrayD<f32>>, f32) {
        let n = obs.len();
        let n_layers = self.n_layers();

        let mut x = Array2::zeros((n, self.config.in_dim));
        for (i, o) in obs.iter().enumerate() {
            x.row_mut(i).assign(o);
        }

        // Forward pass, keeping each layer's activations.
        let mut acts: Vec<Array2<f32>> = Vec::with_capacity(n_layers + 1);
        acts.push(x);
        for l in 0..n_layers {
            let mut z = acts[l].dot(&self.weight(l).t()) + self.bias(l);
            if l + 1 < n_layers {
                z.mapv_inplace(|v| v.max(0.0));
            }
            acts.push(z);
        }

        // Loss gradient on the chosen-action outputs only.
        let q = &acts[n_layers];
        let mut delta = Array2::<f32>::zeros(q.raw_dim());
        let mut loss = 0.0;
        for (i, (&action, &ret)) in actions.iter().zip(returns.iter()).enumerate() {
            let diff = q[[i, action]] - ret;
            loss += diff * diff;
            delta[[i, action]] = 2.0 * diff / n as f32;
        }
        loss /= n as f32;

        // Backward pass.
        let mut grads = vec![ArrayD::zeros(ndarray::IxDyn(&[0])); self.params.len()];
        for l in (0..n_layers).rev() {
            grads[2 * l] = delta.t().dot(&acts[l]).into_dyn();
            grads[2 * l + 1] = delta.sum_axis(Axis(0)).into_dyn();
            if l > 0 {
                let mut prev = delta.dot(&self.weight(l));
                prev.zip_mut_with(&acts[l], |d, &a| {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                });
                delta = prev;
            }
        }
        (grads, loss)
    }
}

#[cfg(test)]
mod tests {
    use super::{Mlp, MlpConfig};
    use ndarray::{arr1, Array1};

    fn loss(net: &Mlp, obs: &[Array1<f32>], actions: &[usize], returns: &[f32]) -> f32 {
        let mut loss = 0.0;
        for (o, (&a, &r)) in obs.iter().zip(actions.iter().zip(returns.iter())) {
            let diff = net.forward(o)[a] - r;
            loss += diff * diff;
        }
        loss / obs.len() as f32
    }

    #[test]
    fn forward_shape() {
        let net = Mlp::build(MlpConfig::new(3, vec![8, 8], 4, 42));
        let q = net.forward(&arr1(&[0.1, -0.5, 1.0]));
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn single_layer_gradients_match_closed_form() {
        // Linear net: q = W x + b, loss = (q[a] - ret)^2.
        let mut net = Mlp::build(MlpConfig::new(2, vec![], 2, 0));
        for p in net.params_mut() {
            p.fill(0.0);
        }
        let obs = vec![arr1(&[1.0, 2.0])];
        let (grads, loss) = net.gradients(&obs, &[1], &[3.0]);
        // q[1] = 0, diff = -3: dL/dw1j = 2 * diff * x_j, dL/db1 = 2 * diff.
        assert!((loss - 9.0).abs() < 1e-6);
        assert!((grads[0][[1, 0]] + 6.0).abs() < 1e-6);
        assert!((grads[0][[1, 1]] + 12.0).abs() < 1e-6);
        assert!((grads[1][[1]] + 6.0).abs() < 1e-6);
        assert_eq!(grads[0][[0, 0]], 0.0);
        assert_eq!(grads[1][[0]], 0.0);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let net = Mlp::build(MlpConfig::new(3, vec![5], 2, 7));
        let obs = vec![
            arr1(&[0.5, -1.0, 0.25]),
            arr1(&[1.0, 0.0, -0.75]),
            arr1(&[-0.25, 0.5, 1.5]),
        ];
        let actions = [0, 1, 0];
        let returns = [1.0, -0.5, 0.25];
        let (grads, _) = net.gradients(&obs, &actions, &returns);

        let eps = 1e-3;
        for t in 0..grads.len() {
            for (ix, &g) in grads[t].indexed_iter() {
                let mut plus = Mlp::build(MlpConfig::new(3, vec![5], 2, 7));
                plus.params_mut()[t][ix.clone()] += eps;
                let mut minus = Mlp::build(MlpConfig::new(3, vec![5], 2, 7));
                minus.params_mut()[t][ix.clone()] -= eps;
                let numeric = (loss(&plus, &obs, &actions, &returns)
                    - loss(&minus, &obs, &actions, &returns))
                    / (2.0 * eps);
                assert!(
                    (numeric - g).abs() < 1e-2,
                    "tensor {} index {:?}: numeric {} vs analytic {}",
                    t,
                    ix,
                    numeric,
                    g
                );
            }
        }
    }
}
