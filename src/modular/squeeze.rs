//! Integer Haar-like squeeze wavelet.
//!
//! Each step halves one axis of the active region: for a pair (even, odd),
//! `avg = floor((even + odd) / 2)` and `diff = even - odd`; low-pass samples
//! pack into the first half of the region, high-pass into the second half.
//! Steps alternate horizontal then vertical per level, recursing into the
//! low-pass sub-region, until both dimensions are `<= 1`.

use crate::array2d::Array2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
  Horizontal,
  Vertical,
}

#[derive(Debug, Clone, Copy)]
pub struct SqueezeStep {
  pub axis: Axis,
  pub region_width: usize,
  pub region_height: usize,
  pub buffer_stride: usize,
}

#[derive(Debug, Clone)]
pub struct SqueezePlan {
  pub steps: Vec<SqueezeStep>,
}

pub const DEFAULT_LEVELS: usize = 3;

/// Build the step list for a region of `width x height`, descending at most
/// `levels` levels (fewer if the region shrinks to `<= 1` on both axes first).
pub fn build_plan(width: usize, height: usize, levels: usize) -> SqueezePlan {
  let mut steps = Vec::new();
  let (mut w, mut h) = (width, height);

  for _ in 0..levels {
    if w <= 1 && h <= 1 {
      break;
    }
    steps.push(SqueezeStep { axis: Axis::Horizontal, region_width: w, region_height: h, buffer_stride: width });
    let new_w = w.div_ceil(2);
    steps.push(SqueezeStep { axis: Axis::Vertical, region_width: new_w, region_height: h, buffer_stride: width });
    let new_h = h.div_ceil(2);
    w = new_w;
    h = new_h;
  }

  SqueezePlan { steps }
}

fn floor_avg(a: i32, b: i32) -> i32 {
  (a + b) >> 1
}

fn inverse_pair(avg: i32, diff: i32) -> (i32, i32) {
  let bias = if diff >= 0 { 1 } else { 0 };
  let even = avg + ((diff + bias) >> 1);
  let odd = even - diff;
  (even, odd)
}

fn squeeze_horizontal_forward(data: &mut Array2D<i32>, step: &SqueezeStep) {
  let (w, h) = (step.region_width, step.region_height);
  let pairs = w / 2;
  let new_w = w.div_ceil(2);
  for row in 0..h {
    let mut low = vec![0i32; new_w];
    let mut high = vec![0i32; pairs];
    for p in 0..pairs {
      let even = data[row][2 * p];
      let odd = data[row][2 * p + 1];
      low[p] = floor_avg(even, odd);
      high[p] = even - odd;
    }
    if w % 2 == 1 {
      low[new_w - 1] = data[row][w - 1];
    }
    for (c, &v) in low.iter().enumerate() {
      data[row][c] = v;
    }
    for (c, &v) in high.iter().enumerate() {
      data[row][new_w + c] = v;
    }
  }
}

fn squeeze_horizontal_inverse(data: &mut Array2D<i32>, step: &SqueezeStep) {
  let (w, h) = (step.region_width, step.region_height);
  let pairs = w / 2;
  let new_w = w.div_ceil(2);
  for row in 0..h {
    let low: Vec<i32> = (0..new_w).map(|c| data[row][c]).collect();
    let high: Vec<i32> = (0..pairs).map(|c| data[row][new_w + c]).collect();
    for p in 0..pairs {
      let (even, odd) = inverse_pair(low[p], high[p]);
      data[row][2 * p] = even;
      data[row][2 * p + 1] = odd;
    }
    if w % 2 == 1 {
      data[row][w - 1] = low[new_w - 1];
    }
  }
}

fn squeeze_vertical_forward(data: &mut Array2D<i32>, step: &SqueezeStep) {
  let (w, h) = (step.region_width, step.region_height);
  let pairs = h / 2;
  let new_h = h.div_ceil(2);
  for col in 0..w {
    let mut low = vec![0i32; new_h];
    let mut high = vec![0i32; pairs];
    for p in 0..pairs {
      let even = data[2 * p][col];
      let odd = data[2 * p + 1][col];
      low[p] = floor_avg(even, odd);
      high[p] = even - odd;
    }
    if h % 2 == 1 {
      low[new_h - 1] = data[h - 1][col];
    }
    for (r, &v) in low.iter().enumerate() {
      data[r][col] = v;
    }
    for (r, &v) in high.iter().enumerate() {
      data[new_h + r][col] = v;
    }
  }
}

fn squeeze_vertical_inverse(data: &mut Array2D<i32>, step: &SqueezeStep) {
  let (w, h) = (step.region_width, step.region_height);
  let pairs = h / 2;
  let new_h = h.div_ceil(2);
  for col in 0..w {
    let low: Vec<i32> = (0..new_h).map(|r| data[r][col]).collect();
    let high: Vec<i32> = (0..pairs).map(|r| data[new_h + r][col]).collect();
    for p in 0..pairs {
      let (even, odd) = inverse_pair(low[p], high[p]);
      data[2 * p][col] = even;
      data[2 * p + 1][col] = odd;
    }
    if h % 2 == 1 {
      data[h - 1][col] = low[new_h - 1];
    }
  }
}

pub fn forward(data: &mut Array2D<i32>, plan: &SqueezePlan) {
  for step in &plan.steps {
    match step.axis {
      Axis::Horizontal => squeeze_horizontal_forward(data, step),
      Axis::Vertical => squeeze_vertical_forward(data, step),
    }
  }
}

pub fn inverse(data: &mut Array2D<i32>, plan: &SqueezePlan) {
  for step in plan.steps.iter().rev() {
    match step.axis {
      Axis::Horizontal => squeeze_horizontal_inverse(data, step),
      Axis::Vertical => squeeze_vertical_inverse(data, step),
    }
  }
}
