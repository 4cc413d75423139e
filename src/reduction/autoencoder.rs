use super::{Reduction, check_columns};
use crate::error::{Result, RomError};
use crate::model::{
    AutoencoderNet, Forward, InferBackend, Mlp, TrainBackend, TrainingSettings, to_matrix,
    to_tensor, train,
};
use crate::scaling::MinMaxScaler;
use burn::module::AutodiffModule;
use burn::prelude::Backend;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// オートエンコーダの設定。
///
/// `encoder_layers` と `decoder_layers` は隠れ層のユニット数のみを指定し、
/// 入出力層の大きさはスナップショットの次元と潜在次元から決まります。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoencoderConfig {
    pub encoder_layers: Vec<usize>,
    pub decoder_layers: Vec<usize>,
    pub latent_dimension: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub loss_tolerance: Option<f64>,
    pub seed: u64,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            encoder_layers: vec![32, 16],
            decoder_layers: vec![16, 32],
            latent_dimension: 2,
            epochs: 1000,
            learning_rate: 1e-3,
            loss_tolerance: Some(1e-6),
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    encoder: Mlp<InferBackend>,
    decoder: Mlp<InferBackend>,
    scaler: MinMaxScaler,
}

/// 全結合ネットワークによるオートエンコーダ次元削減。
#[derive(Debug, Clone)]
pub struct Autoencoder {
    config: AutoencoderConfig,
    fitted: Option<Fitted>,
    loss_history: Vec<f32>,
}

impl Autoencoder {
    pub fn new(config: AutoencoderConfig) -> Self {
        Self {
            config,
            fitted: None,
            loss_history: Vec::new(),
        }
    }

    pub fn config(&self) -> &AutoencoderConfig {
        &self.config
    }

    /// 直近の学習の損失履歴。
    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted.as_ref().ok_or(RomError::NotFitted("オートエンコーダ"))
    }
}

impl Reduction for Autoencoder {
    fn fit(&mut self, snapshots: &DMatrix<f64>) -> Result<()> {
        let (samples, dimension) = snapshots.shape();
        let latent = self.config.latent_dimension;
        if latent == 0 {
            return Err(RomError::Configuration(
                "潜在次元は1以上である必要があります".to_string(),
            ));
        }
        if latent > samples {
            return Err(RomError::InsufficientSamples {
                samples,
                required: latent,
            });
        }

        let mut encoder_layers = vec![dimension];
        encoder_layers.extend(&self.config.encoder_layers);
        encoder_layers.push(latent);
        let mut decoder_layers = vec![latent];
        decoder_layers.extend(&self.config.decoder_layers);
        decoder_layers.push(dimension);

        TrainBackend::seed(self.config.seed);
        let device = Default::default();
        let net = AutoencoderNet::<TrainBackend> {
            encoder: Mlp::new(&encoder_layers, &device)?,
            decoder: Mlp::new(&decoder_layers, &device)?,
        };

        let scaler = MinMaxScaler::fit(snapshots);
        let data = to_tensor::<TrainBackend>(&scaler.transform(snapshots), &device);
        let settings = TrainingSettings {
            epochs: self.config.epochs,
            learning_rate: self.config.learning_rate,
            loss_tolerance: self.config.loss_tolerance,
            log_every: (self.config.epochs / 20).max(1),
        };
        let (net, history) = train(net, data.clone(), data, &settings);
        debug!(
            samples,
            dimension,
            latent,
            final_loss = history.last().copied().unwrap_or(f32::NAN),
            "オートエンコーダを学習しました"
        );

        let net = net.valid();
        self.loss_history = history;
        self.fitted = Some(Fitted {
            encoder: net.encoder,
            decoder: net.decoder,
            scaler,
        });
        Ok(())
    }

    fn reduce(&self, snapshots: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let fitted = self.fitted()?;
        check_columns(snapshots, fitted.scaler.dimension())?;
        let device = Default::default();
        let input = to_tensor::<InferBackend>(&fitted.scaler.transform(snapshots), &device);
        to_matrix(fitted.encoder.forward(input))
    }

    fn expand(&self, reduced: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let fitted = self.fitted()?;
        check_columns(reduced, self.config.latent_dimension)?;
        let device = Default::default();
        let input = to_tensor::<InferBackend>(reduced, &device);
        let decoded = to_matrix(fitted.decoder.forward(input))?;
        Ok(fitted.scaler.inverse_transform(&decoded))
    }

    fn rank(&self) -> Option<usize> {
        self.fitted.as_ref().map(|_| self.config.latent_dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset;

    fn quick_config(latent: usize) -> AutoencoderConfig {
        AutoencoderConfig {
            encoder_layers: vec![8],
            decoder_layers: vec![8],
            latent_dimension: latent,
            epochs: 30,
            learning_rate: 1e-2,
            loss_tolerance: None,
            seed: 1,
        }
    }

    #[test]
    fn reduce_and_expand_have_expected_shapes() {
        let db = dataset::gaussian(6, 12).unwrap();
        let mut ae = Autoencoder::new(quick_config(2));
        ae.fit(db.snapshots()).unwrap();
        assert_eq!(ae.rank(), Some(2));
        let reduced = ae.reduce(db.snapshots()).unwrap();
        assert_eq!(reduced.shape(), (6, 2));
        let restored = ae.expand(&reduced).unwrap();
        assert_eq!(restored.shape(), (6, 12));
        assert!(restored.iter().all(|v| v.is_finite()));
        assert!(!ae.loss_history().is_empty());
    }

    #[test]
    fn latent_dimension_above_sample_count_is_insufficient() {
        let db = dataset::gaussian(3, 12).unwrap();
        let mut ae = Autoencoder::new(quick_config(4));
        assert!(matches!(
            ae.fit(db.snapshots()),
            Err(RomError::InsufficientSamples {
                samples: 3,
                required: 4
            })
        ));
    }

    #[test]
    fn expand_checks_latent_width() {
        let db = dataset::gaussian(4, 6).unwrap();
        let mut ae = Autoencoder::new(quick_config(1));
        ae.fit(db.snapshots()).unwrap();
        assert!(matches!(
            ae.expand(&DMatrix::zeros(1, 3)),
            Err(RomError::DimensionMismatch { .. })
        ));
    }
}
