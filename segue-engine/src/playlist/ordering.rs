//! Energy curve ordering
//!
//! - `Ascending` / `Descending`: stable sort by energy
//! - `Wave`: highest remaining, then lowest remaining, alternating
//! - `Plateau`: stable sort by distance from the seed's energy
//!
//! Ties keep input order, so equal energies stay in ranking order.

use super::EnergyCurve;

/// Reorder `items` along `curve`
///
/// # Arguments
/// * `seed_energy` - Reference energy for `Plateau`
/// * `energy_of` - Energy of an item (expected 0.0-1.0)
pub fn order_by_curve<T, F>(mut items: Vec<T>, curve: EnergyCurve, seed_energy: f64, energy_of: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    match curve {
        EnergyCurve::Ascending => {
            items.sort_by(|a, b| energy_of(a).total_cmp(&energy_of(b)));
            items
        }
        EnergyCurve::Descending => {
            items.sort_by(|a, b| energy_of(b).total_cmp(&energy_of(a)));
            items
        }
        EnergyCurve::Plateau => {
            items.sort_by(|a, b| {
                (energy_of(a) - seed_energy)
                    .abs()
                    .total_cmp(&(energy_of(b) - seed_energy).abs())
            });
            items
        }
        EnergyCurve::Wave => {
            items.sort_by(|a, b| energy_of(a).total_cmp(&energy_of(b)));
            let mut sorted = std::collections::VecDeque::from(items);
            let mut ordered = Vec::with_capacity(sorted.len());
            let mut peak = true;
            while let Some(item) = if peak { sorted.pop_back() } else { sorted.pop_front() } {
                ordered.push(item);
                peak = !peak;
            }
            ordered
        }
    }
}
