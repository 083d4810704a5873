pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Pearson correlation of two equally long vectors.
///
/// `None` when fewer than two pairs exist or either side is constant; a
/// constant side has no variance and the coefficient is undefined.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    if is_constant(xs) || is_constant(ys) {
        return None;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let mut numerator = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;

    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        numerator += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    if denom_x <= 0.0 || denom_y <= 0.0 {
        return None;
    }

    let r = numerator / (denom_x.sqrt() * denom_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Pearson correlation over the rows where both values are present.
pub fn pearson_complete(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let (left, right): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    pearson(&left, &right)
}

/// Quantile with linear interpolation between the closest order statistics.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|value| *value == values[0])
}
