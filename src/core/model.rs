//! Pre-trained sequence regressor.
//!
//! The model artifact is a JSON export of a stacked LSTM followed by dense
//! layers, using the Keras weight layout:
//!
//! - `kernel`: `input_dim x 4*units`
//! - `recurrent_kernel`: `units x 4*units`
//! - `bias`: `4*units`
//! - gate order: input, forget, cell, output
//!
//! Only the final hidden state of the last LSTM layer feeds the dense head,
//! whose last layer has a single output: the forecast concentration.

use crate::core::error::ForecastError;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A model mapping one scaled feature sequence to one scalar.
///
/// Implementations hold no mutable state: the same input always yields the
/// same output.
pub trait Regressor: Send + Sync {
    /// Expected (timesteps, features) of the input sequence.
    fn input_shape(&self) -> (usize, usize);

    /// One forward pass.
    fn predict(&self, sequence: ArrayView2<'_, f64>) -> Result<f64, ForecastError>;
}

/// Dense layer activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
}

/// Serialized LSTM layer weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayerSpec {
    pub units: usize,
    pub kernel: Vec<Vec<f64>>,
    pub recurrent_kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

/// Serialized dense layer weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayerSpec {
    /// `input_dim x output_dim`
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

/// On-disk model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmModelSpec {
    pub timesteps: usize,
    pub features: usize,
    pub lstm: Vec<LstmLayerSpec>,
    pub dense: Vec<DenseLayerSpec>,
}

struct LstmLayer {
    units: usize,
    kernel: Array2<f64>,
    recurrent_kernel: Array2<f64>,
    bias: Array1<f64>,
}

struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

/// Stacked LSTM regressor with a dense head.
pub struct LstmRegressor {
    timesteps: usize,
    features: usize,
    lstm: Vec<LstmLayer>,
    dense: Vec<DenseLayer>,
}

impl LstmRegressor {
    /// Load a model artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        if !path.exists() {
            return Err(ForecastError::ArtifactNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;
        let spec: LstmModelSpec =
            serde_json::from_str(&content).map_err(|e| invalid(path, e.to_string()))?;
        let model = Self::from_spec(spec).map_err(|reason| invalid(path, reason))?;

        tracing::info!(
            path = %path.display(),
            timesteps = model.timesteps,
            features = model.features,
            lstm_layers = model.lstm.len(),
            dense_layers = model.dense.len(),
            "Loaded model"
        );
        Ok(model)
    }

    /// Build a regressor from in-memory weights, checking every shape.
    pub fn from_spec(spec: LstmModelSpec) -> Result<Self, String> {
        if spec.timesteps == 0 || spec.features == 0 {
            return Err("timesteps and features must be positive".to_string());
        }
        if spec.lstm.is_empty() {
            return Err("at least one LSTM layer is required".to_string());
        }
        if spec.dense.is_empty() {
            return Err("at least one dense layer is required".to_string());
        }

        let mut input_dim = spec.features;
        let mut lstm = Vec::with_capacity(spec.lstm.len());
        for (idx, layer) in spec.lstm.into_iter().enumerate() {
            let gates = 4 * layer.units;
            let kernel = to_matrix(&layer.kernel, input_dim, gates)
                .map_err(|e| format!("lstm[{idx}].kernel: {e}"))?;
            let recurrent_kernel = to_matrix(&layer.recurrent_kernel, layer.units, gates)
                .map_err(|e| format!("lstm[{idx}].recurrent_kernel: {e}"))?;
            if layer.bias.len() != gates {
                return Err(format!(
                    "lstm[{idx}].bias: expected {gates} values, got {}",
                    layer.bias.len()
                ));
            }
            input_dim = layer.units;
            lstm.push(LstmLayer {
                units: layer.units,
                kernel,
                recurrent_kernel,
                bias: Array1::from(layer.bias),
            });
        }

        let mut dense = Vec::with_capacity(spec.dense.len());
        for (idx, layer) in spec.dense.into_iter().enumerate() {
            let output_dim = layer.bias.len();
            let weights = to_matrix(&layer.weights, input_dim, output_dim)
                .map_err(|e| format!("dense[{idx}].weights: {e}"))?;
            input_dim = output_dim;
            dense.push(DenseLayer {
                weights,
                bias: Array1::from(layer.bias),
                activation: layer.activation,
            });
        }
        if input_dim != 1 {
            return Err(format!("final dense layer must have 1 output, has {input_dim}"));
        }

        Ok(Self {
            timesteps: spec.timesteps,
            features: spec.features,
            lstm,
            dense,
        })
    }
}

impl Regressor for LstmRegressor {
    fn input_shape(&self) -> (usize, usize) {
        (self.timesteps, self.features)
    }

    fn predict(&self, sequence: ArrayView2<'_, f64>) -> Result<f64, ForecastError> {
        if sequence.dim() != (self.timesteps, self.features) {
            let (rows, cols) = sequence.dim();
            return Err(ForecastError::Inference(format!(
                "input shape {rows}x{cols} does not match model input {}x{}",
                self.timesteps, self.features
            )));
        }

        if let Some(((row, col), value)) = sequence.indexed_iter().find(|(_, v)| !v.is_finite())
        {
            return Err(ForecastError::Inference(format!(
                "non-finite input {value} at step {row}, feature {col}"
            )));
        }

        let mut seq = sequence.to_owned();
        for layer in &self.lstm {
            seq = layer.run(seq.view());
        }

        // Final hidden state of the last recurrent layer
        let mut x = seq.row(seq.nrows() - 1).to_owned();
        for layer in &self.dense {
            x = layer.forward(x.view());
        }

        let value = x[0];
        if !value.is_finite() {
            return Err(ForecastError::Inference(format!(
                "model produced a non-finite value ({value})"
            )));
        }
        Ok(value)
    }
}

impl LstmLayer {
    /// Run the layer over the whole sequence, returning every hidden state.
    fn run(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
        let u = self.units;
        let mut h = Array1::<f64>::zeros(u);
        let mut c = Array1::<f64>::zeros(u);
        let mut outputs = Array2::<f64>::zeros((inputs.nrows(), u));

        for (t, x) in inputs.rows().into_iter().enumerate() {
            let z = x.dot(&self.kernel) + h.dot(&self.recurrent_kernel) + &self.bias;

            let i = z.slice(s![0..u]).mapv(sigmoid);
            let f = z.slice(s![u..2 * u]).mapv(sigmoid);
            let g = z.slice(s![2 * u..3 * u]).mapv(f64::tanh);
            let o = z.slice(s![3 * u..4 * u]).mapv(sigmoid);

            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f64::tanh);
            outputs.row_mut(t).assign(&h);
        }

        outputs
    }
}

impl DenseLayer {
    fn forward(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let y = x.dot(&self.weights) + &self.bias;
        match self.activation {
            Activation::Linear => y,
            // `f64::max` would turn NaN into 0.0
            Activation::Relu => y.mapv(|v| if v < 0.0 { 0.0 } else { v }),
        }
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn to_matrix(rows: &[Vec<f64>], nrows: usize, ncols: usize) -> Result<Array2<f64>, String> {
    if rows.len() != nrows {
        return Err(format!("expected {nrows} rows, got {}", rows.len()));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != ncols) {
        return Err(format!(
            "row {bad}: expected {ncols} values, got {}",
            rows[bad].len()
        ));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((nrows, ncols), flat).map_err(|e| e.to_string())
}

fn invalid(path: &Path, reason: String) -> ForecastError {
    ForecastError::ArtifactInvalid {
        path: PathBuf::from(path),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// One LSTM unit with all-zero weights and a dense head `y = 3h + 7`.
    fn constant_spec(features: usize) -> LstmModelSpec {
        LstmModelSpec {
            timesteps: 6,
            features,
            lstm: vec![LstmLayerSpec {
                units: 1,
                kernel: vec![vec![0.0; 4]; features],
                recurrent_kernel: vec![vec![0.0; 4]],
                bias: vec![0.0; 4],
            }],
            dense: vec![DenseLayerSpec {
                weights: vec![vec![3.0]],
                bias: vec![7.0],
                activation: Activation::Linear,
            }],
        }
    }

    #[test]
    fn test_zero_weights_give_bias() {
        let model = LstmRegressor::from_spec(constant_spec(15)).unwrap();
        let input = Array2::<f64>::zeros((6, 15));
        // With zero weights every gate is sigmoid(0)=0.5 and the candidate is
        // tanh(0)=0, so the state stays at zero and only the dense bias remains.
        let value = model.predict(input.view()).unwrap();
        assert!((value - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_step_matches_hand_computation() {
        // One feature, one unit, input gate and cell candidate driven by x.
        let spec = LstmModelSpec {
            timesteps: 1,
            features: 1,
            lstm: vec![LstmLayerSpec {
                units: 1,
                kernel: vec![vec![1.0, 0.0, 1.0, 0.0]],
                recurrent_kernel: vec![vec![0.0; 4]],
                bias: vec![0.0; 4],
            }],
            dense: vec![DenseLayerSpec {
                weights: vec![vec![1.0]],
                bias: vec![0.0],
                activation: Activation::Linear,
            }],
        };
        let model = LstmRegressor::from_spec(spec).unwrap();
        let x = 0.8_f64;
        let input = Array2::from_elem((1, 1), x);

        let i = sigmoid(x);
        let g = x.tanh();
        let o = sigmoid(0.0);
        let c = i * g;
        let expected = o * c.tanh();

        let value = model.predict(input.view()).unwrap();
        assert!((value - expected).abs() < 1e-12);
    }

    #[test]
    fn test_relu_head() {
        let mut spec = constant_spec(2);
        spec.dense = vec![
            DenseLayerSpec {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![-5.0, 2.0],
                activation: Activation::Relu,
            },
            DenseLayerSpec {
                weights: vec![vec![10.0], vec![1.0]],
                bias: vec![0.0],
                activation: Activation::Linear,
            },
        ];
        let model = LstmRegressor::from_spec(spec).unwrap();
        let value = model.predict(Array2::<f64>::zeros((6, 2)).view()).unwrap();
        assert!((value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let model = LstmRegressor::from_spec(constant_spec(3)).unwrap();
        let input = Array2::from_shape_fn((6, 3), |(r, c)| (r * 3 + c) as f64 * 0.1);
        let a = model.predict(input.view()).unwrap();
        let b = model.predict(input.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_mismatch_is_inference_error() {
        let model = LstmRegressor::from_spec(constant_spec(15)).unwrap();
        let err = model
            .predict(Array2::<f64>::zeros((5, 15)).view())
            .unwrap_err();
        assert_eq!(err.code(), "INFERENCE_ERROR");
    }

    #[test]
    fn test_non_finite_input_is_inference_error() {
        let model = LstmRegressor::from_spec(constant_spec(2)).unwrap();
        let mut input = Array2::<f64>::zeros((6, 2));
        input[[5, 0]] = f64::NAN;
        let err = model.predict(input.view()).unwrap_err();
        assert!(matches!(err, ForecastError::Inference(ref msg) if msg.contains("step 5")));
    }

    #[test]
    fn test_nan_cell_with_relu_head_is_inference_error() {
        let mut spec = constant_spec(2);
        spec.dense = vec![
            DenseLayerSpec {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![-5.0, 2.0],
                activation: Activation::Relu,
            },
            DenseLayerSpec {
                weights: vec![vec![10.0], vec![1.0]],
                bias: vec![72.0],
                activation: Activation::Linear,
            },
        ];
        let model = LstmRegressor::from_spec(spec).unwrap();
        let mut input = Array2::<f64>::zeros((6, 2));
        input[[2, 1]] = f64::NAN;
        let err = model.predict(input.view()).unwrap_err();
        assert_eq!(err.code(), "INFERENCE_ERROR");
    }

    #[test]
    fn test_relu_keeps_nan() {
        let layer = DenseLayer {
            weights: Array2::from_elem((1, 2), 1.0),
            bias: Array1::from(vec![0.0, -3.0]),
            activation: Activation::Relu,
        };
        let out = layer.forward(Array1::from(vec![f64::NAN]).view());
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());

        let out = layer.forward(Array1::from(vec![1.0]).view());
        assert_eq!(out.to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_bad_shapes_rejected() {
        let mut spec = constant_spec(15);
        spec.lstm[0].kernel.pop();
        assert!(LstmRegressor::from_spec(spec).is_err());

        let mut spec = constant_spec(15);
        spec.dense[0].bias = vec![0.0, 0.0];
        spec.dense[0].weights = vec![vec![1.0, 1.0]];
        let err = LstmRegressor::from_spec(spec).err().unwrap();
        assert!(err.contains("1 output"));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("alertair-no-such-model.json");
        let err = LstmRegressor::load(&path).err().unwrap();
        assert_eq!(err, ForecastError::ArtifactNotFound(path));
    }
}
