use crate::error::{Result, RomError};
use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::{MseLoss, Reduction as LossReduction};
use burn::nn::{Linear, LinearConfig, Tanh};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use nalgebra::DMatrix;
use tracing::debug;

/// 学習に使うバックエンド。
pub type TrainBackend = Autodiff<NdArray<f32>>;
/// 学習後の推論に使うバックエンド。
pub type InferBackend = NdArray<f32>;

/// 多層パーセプトロン。
///
/// 隠れ層の間に tanh を挟み、出力層は線形です。
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    linears: Vec<Linear<B>>,
    activation: Tanh,
}

impl<B: Backend> Mlp<B> {
    /// 各層のユニット数 `[入力, 隠れ..., 出力]` からモデルを初期化します。
    pub fn new(layers: &[usize], device: &B::Device) -> Result<Self> {
        if layers.len() < 2 || layers.contains(&0) {
            return Err(RomError::Configuration(format!(
                "層構成 {:?} は不正です（2層以上・各層1ユニット以上が必要）",
                layers
            )));
        }
        let linears = layers
            .windows(2)
            .map(|w| LinearConfig::new(w[0], w[1]).init(device))
            .collect();
        Ok(Self {
            linears,
            activation: Tanh::new(),
        })
    }
}

/// 2次元テンソルを受け取り2次元テンソルを返すネットワーク。
pub trait Forward<B: Backend> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2>;
}

impl<B: Backend> Forward<B> for Mlp<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.linears.len() - 1;
        let mut x = input;
        for (i, linear) in self.linears.iter().enumerate() {
            x = linear.forward(x);
            if i < last {
                x = self.activation.forward(x);
            }
        }
        x
    }
}

/// エンコーダとデコーダを直列につないだオートエンコーダ。
#[derive(Module, Debug)]
pub struct AutoencoderNet<B: Backend> {
    pub encoder: Mlp<B>,
    pub decoder: Mlp<B>,
}

impl<B: Backend> Forward<B> for AutoencoderNet<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.decoder.forward(self.encoder.forward(input))
    }
}

/// 学習ループの設定。
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSettings {
    pub epochs: usize,
    pub learning_rate: f64,
    /// 損失がこの値を下回ったら打ち切る
    pub loss_tolerance: Option<f64>,
    /// 何エポックごとに損失を記録・ログ出力するか
    pub log_every: usize,
}

/// Adam と平均二乗誤差でモデルを学習し、学習後のモデルと損失履歴を返します。
pub fn train<M>(
    mut model: M,
    inputs: Tensor<TrainBackend, 2>,
    targets: Tensor<TrainBackend, 2>,
    settings: &TrainingSettings,
) -> (M, Vec<f32>)
where
    M: AutodiffModule<TrainBackend> + Forward<TrainBackend>,
{
    let mut optim = AdamConfig::new().init::<TrainBackend, M>();
    let log_every = settings.log_every.max(1);
    let mut history = Vec::new();

    for epoch in 1..=settings.epochs {
        let prediction = model.forward(inputs.clone());
        let loss = MseLoss::new().forward(prediction, targets.clone(), LossReduction::Mean);

        // スカラー値の読み出しは同期を伴うので、記録か収束判定が必要なエポックに限る
        let logging = epoch % log_every == 0 || epoch == settings.epochs;
        if logging || settings.loss_tolerance.is_some() {
            let loss_val: f32 = loss.clone().into_scalar();
            let converged = settings
                .loss_tolerance
                .is_some_and(|tol| f64::from(loss_val) < tol);
            if logging || converged {
                history.push(loss_val);
                debug!(epoch, loss = loss_val, "学習中");
            }
            if converged {
                debug!(epoch, loss = loss_val, "損失が閾値を下回ったため学習を終了");
                break;
            }
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(settings.learning_rate, model, grads);
    }
    (model, history)
}

/// 行列を `[行数, 列数]` のテンソルに変換します。
pub fn to_tensor<B: Backend>(matrix: &DMatrix<f64>, device: &B::Device) -> Tensor<B, 2> {
    let mut values = Vec::with_capacity(matrix.len());
    for row in matrix.row_iter() {
        values.extend(row.iter().map(|&v| v as f32));
    }
    Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([matrix.nrows(), matrix.ncols()])
}

/// 推論バックエンドのテンソルを行列に戻します。
pub fn to_matrix(tensor: Tensor<InferBackend, 2>) -> Result<DMatrix<f64>> {
    let [rows, cols] = tensor.dims();
    let values = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| RomError::Numerical(format!("テンソルの読み出しに失敗しました: {:?}", e)))?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(RomError::Numerical(
            "ネットワークの出力に有限でない値が含まれています".to_string(),
        ));
    }
    Ok(DMatrix::from_row_iterator(
        rows,
        cols,
        values.into_iter().map(f64::from),
    ))
}
