//! PNG グラフの出力。

use plotters::prelude::*;
use std::path::Path;

/// 学習過程の損失をグラフとしてPNGファイルに出力します。
pub fn plot_loss_history<P: AsRef<Path>>(
    path: P,
    loss_hist: &[f32],
    log_every: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let values: Vec<f64> = loss_hist.iter().map(|&v| f64::from(v)).collect();
    let (min_log, max_log) = log_range(&values);
    let root = BitMapBackend::new(path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Loss History", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..values.len().max(1), min_log..max_log)?;
    chart
        .configure_mesh()
        .y_desc("Loss (log10 scale)")
        .x_desc(format!("Epochs (x{})", log_every))
        .draw()?;
    chart
        .draw_series(LineSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &val)| (i, safe_log10(val))),
            &RED,
        ))?
        .label("Reconstruction Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// 分割ごとの交差検証誤差を棒グラフで出力します。
pub fn plot_fold_errors<P: AsRef<Path>>(
    path: P,
    fold_errors: &[f64],
) -> Result<(), Box<dyn std::error::Error>> {
    let finite: Vec<f64> = fold_errors.iter().copied().filter(|v| v.is_finite()).collect();
    let max_err = finite.iter().copied().fold(0.0, f64::max).max(f64::MIN_POSITIVE) * 1.1;
    let mean_err = if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    let k = fold_errors.len();

    let root = BitMapBackend::new(path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Cross-Validation Error", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0..k.max(1), 0.0..max_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Mean error")
        .x_desc("Fold")
        .draw()?;
    chart
        .draw_series(fold_errors.iter().enumerate().map(|(i, &e)| {
            let height = if e.is_finite() { e } else { max_err };
            Rectangle::new([(i, 0.0), (i + 1, height)], BLUE.mix(0.6).filled())
        }))?
        .label("Fold error")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.6).filled()));
    chart
        .draw_series(LineSeries::new(vec![(0, mean_err), (k.max(1), mean_err)], &RED))?
        .label("Mean")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// POD の特異値の減衰を対数スケールで出力します。
pub fn plot_singular_values<P: AsRef<Path>>(
    path: P,
    singular_values: &[f64],
) -> Result<(), Box<dyn std::error::Error>> {
    let (min_log, max_log) = log_range(singular_values);
    let root = BitMapBackend::new(path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("POD Singular Values", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(1..singular_values.len().max(1) + 1, min_log..max_log)?;
    chart
        .configure_mesh()
        .y_desc("Singular value (log10 scale)")
        .x_desc("Mode")
        .draw()?;
    chart.draw_series(
        singular_values
            .iter()
            .enumerate()
            .map(|(i, &s)| Circle::new((i + 1, safe_log10(s)), 4, BLUE.filled())),
    )?;
    chart.draw_series(LineSeries::new(
        singular_values
            .iter()
            .enumerate()
            .map(|(i, &s)| (i + 1, safe_log10(s))),
        &BLUE,
    ))?;
    root.present()?;
    Ok(())
}

/// 0 や負の値は描画できないため下限で切ります。
fn safe_log10(v: f64) -> f64 {
    v.max(1e-16).log10()
}

fn log_range(values: &[f64]) -> (f64, f64) {
    let logs: Vec<f64> = values.iter().map(|&v| safe_log10(v)).collect();
    let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = logs.iter().copied().fold(f64::INFINITY, f64::min);
    if !max.is_finite() || !min.is_finite() {
        return (-6.0, 0.0);
    }
    (min - 0.5, max + 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_range_pads_bounds() {
        let (lo, hi) = log_range(&[1.0, 100.0]);
        assert_eq!((lo, hi), (-0.5, 2.5));
        assert_eq!(log_range(&[]), (-6.0, 0.0));
    }

    #[test]
    fn zero_is_clamped_before_log() {
        assert_eq!(safe_log10(0.0), -16.0);
    }
}
