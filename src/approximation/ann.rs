use super::{Approximation, check_columns, check_training_pair};
use crate::error::{Result, RomError};
use crate::model::{Forward, InferBackend, Mlp, TrainBackend, TrainingSettings, to_matrix, to_tensor, train};
use crate::scaling::MinMaxScaler;
use burn::module::AutodiffModule;
use burn::prelude::Backend;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// ニューラルネットワーク回帰の設定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnConfig {
    pub hidden_layers: Vec<usize>,
    pub epochs: usize,
    pub learning_rate: f64,
    pub loss_tolerance: Option<f64>,
    pub seed: u64,
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![20, 20],
            epochs: 2000,
            learning_rate: 1e-3,
            loss_tolerance: Some(1e-6),
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    network: Mlp<InferBackend>,
    inputs: MinMaxScaler,
    outputs: MinMaxScaler,
}

/// 多層パーセプトロンによる回帰。
///
/// 入力・出力とも列ごとに `[-1, 1]` へスケーリングしてから学習します。
#[derive(Debug, Clone)]
pub struct Ann {
    config: AnnConfig,
    fitted: Option<Fitted>,
    loss_history: Vec<f32>,
}

impl Ann {
    pub fn new(config: AnnConfig) -> Self {
        Self {
            config,
            fitted: None,
            loss_history: Vec::new(),
        }
    }

    /// 直近の学習の損失履歴。
    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }
}

impl Approximation for Ann {
    fn fit(&mut self, points: &DMatrix<f64>, values: &DMatrix<f64>) -> Result<()> {
        check_training_pair(points, values)?;
        self.fitted = None;

        let mut layers = vec![points.ncols()];
        layers.extend(&self.config.hidden_layers);
        layers.push(values.ncols());

        TrainBackend::seed(self.config.seed);
        let device = Default::default();
        let network = Mlp::<TrainBackend>::new(&layers, &device)?;

        let inputs = MinMaxScaler::fit(points);
        let outputs = MinMaxScaler::fit(values);
        let settings = TrainingSettings {
            epochs: self.config.epochs,
            learning_rate: self.config.learning_rate,
            loss_tolerance: self.config.loss_tolerance,
            log_every: (self.config.epochs / 20).max(1),
        };
        let (network, history) = train(
            network,
            to_tensor(&inputs.transform(points), &device),
            to_tensor(&outputs.transform(values), &device),
            &settings,
        );
        debug!(
            samples = points.nrows(),
            final_loss = history.last().copied().unwrap_or(f32::NAN),
            "ニューラルネットワーク回帰を学習しました"
        );

        self.loss_history = history;
        self.fitted = Some(Fitted {
            network: network.valid(),
            inputs,
            outputs,
        });
        Ok(())
    }

    fn predict(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(RomError::NotFitted("ニューラルネットワーク回帰"))?;
        check_columns(points, fitted.inputs.dimension())?;
        let device = Default::default();
        let input = to_tensor::<InferBackend>(&fitted.inputs.transform(points), &device);
        let output = to_matrix(fitted.network.forward(input))?;
        Ok(fitted.outputs.inverse_transform(&output))
    }
}
