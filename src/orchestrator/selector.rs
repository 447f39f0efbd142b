//! Weighted-random primary selection with ordered fallback.

use rand::Rng;

/// Anything that can take part in weighted selection.
///
/// Availability and preference are separate: a disabled item is never tried,
/// an enabled item with weight 0 is never tried either, and among the rest the
/// weight only decides how likely an item is to go first.
pub trait Weighted {
    fn weight(&self) -> f64;

    fn enabled(&self) -> bool {
        true
    }

    fn is_usable(&self) -> bool {
        let w = self.weight();
        self.enabled() && w.is_finite() && w > 0.0
    }
}

/// Plain weight/enabled pair, handy when weights are computed on the fly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub weight: f64,
    pub enabled: bool,
}

impl Weighted for Candidate {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no usable method: every candidate is disabled or has zero weight")]
pub struct NoUsableMethod;

/// Indices into the input slice, primary first, then the remaining usable
/// items in declaration order.
pub type AttemptOrder = Vec<usize>;

/// Draw the primary by cumulative weight over `[0, total)` and append every
/// other usable item as fallback.
///
/// Weights are relative: only their ratios affect the draw.
pub fn select<W: Weighted, R: Rng + ?Sized>(
    items: &[W],
    rng: &mut R,
) -> Result<AttemptOrder, NoUsableMethod> {
    let usable: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_usable())
        .map(|(idx, _)| idx)
        .collect();

    let Some(&first) = usable.first() else {
        return Err(NoUsableMethod);
    };

    // Scale by the largest weight so the sum stays finite for huge inputs.
    let scale = usable
        .iter()
        .map(|&idx| items[idx].weight())
        .fold(0.0_f64, f64::max);
    let share = |idx: usize| items[idx].weight() / scale;
    let total: f64 = usable.iter().map(|&idx| share(idx)).sum();
    let draw = rng.gen_range(0.0..total);

    let mut cumulative = 0.0;
    let mut primary = first;
    for &idx in &usable {
        cumulative += share(idx);
        if draw < cumulative {
            primary = idx;
            break;
        }
    }
    // Float rounding can leave the draw at or past the final sum.
    if draw >= cumulative {
        primary = usable[usable.len() - 1];
    }

    let mut order = Vec::with_capacity(usable.len());
    order.push(primary);
    order.extend(usable.into_iter().filter(|&idx| idx != primary));
    Ok(order)
}
