/// How the split-point control was picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitChoice {
    /// The control nearest to the marker while strictly above it.
    NearestAbove { index: usize, distance: f64 },
    /// The first control in document order.
    Fallback { index: usize, reason: FallbackReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    MarkerNotFound,
    NoControlAboveMarker,
}

impl SplitChoice {
    pub fn index(&self) -> usize {
        match self {
            SplitChoice::NearestAbove { index, .. } | SplitChoice::Fallback { index, .. } => *index,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SplitChoice::Fallback { .. })
    }
}

/// Picks a split-point control from the vertical positions of all controls.
///
/// A control qualifies only when its top is strictly above the marker's top;
/// the smallest positive distance wins and equal distances keep document
/// order. A control level with or below the marker is never chosen by this
/// rule. Without a marker position, or with nothing above it, the first
/// control is used. Returns `None` when there are no controls.
///
/// The `NoControlAboveMarker` fallback breaks the rule above: when every
/// control sits at or below the marker, the first one is still below it and
/// the paid line lands after the marker. It is kept so a priced article is
/// never left without a split point; callers must surface the `Fallback`
/// choice as a soft failure so the placement can be checked by hand.
pub fn choose_split_control(control_tops: &[f64], marker_top: Option<f64>) -> Option<SplitChoice> {
    if control_tops.is_empty() {
        return None;
    }
    let Some(marker_top) = marker_top else {
        return Some(SplitChoice::Fallback {
            index: 0,
            reason: FallbackReason::MarkerNotFound,
        });
    };

    let mut best: Option<(usize, f64)> = None;
    for (index, &top) in control_tops.iter().enumerate() {
        let distance = marker_top - top;
        if distance <= 0.0 || distance.is_nan() {
            continue;
        }
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((index, distance)),
        }
    }

    Some(match best {
        Some((index, distance)) => SplitChoice::NearestAbove { index, distance },
        None => SplitChoice::Fallback {
            index: 0,
            reason: FallbackReason::NoControlAboveMarker,
        },
    })
}

/// Finds the price input among numeric inputs: the first whose current value
/// is an integer at or above `minimum`. The price field carries no stable
/// attribute, but it is pre-filled with the platform's default price.
pub fn pick_price_field<S: AsRef<str>>(values: &[Option<S>], minimum: u32) -> Option<usize> {
    values.iter().position(|value| {
        let Some(value) = value.as_ref().map(|v| v.as_ref().trim()) else {
            return false;
        };
        !value.is_empty()
            && value.chars().all(|c| c.is_ascii_digit())
            && value
                .parse::<u64>()
                .map(|n| n >= u64::from(minimum))
                .unwrap_or(false)
    })
}
