use tracing::debug;

use super::error::ExtractorError;
use crate::media::Variant;

/// Pick the variant with the highest quality tag.
///
/// Untagged variants are never selected; on equal rank the earlier variant
/// wins.
pub fn select_best<I>(variants: I) -> Result<Variant, ExtractorError>
where
    I: IntoIterator<Item = Variant>,
{
    let mut best: Option<(u8, Variant)> = None;

    for variant in variants {
        let Some(quality) = variant.quality() else {
            debug!(url = %variant.url, "Variant has no quality tag");
            continue;
        };
        let rank = quality.rank();
        if best.as_ref().is_none_or(|(best_rank, _)| rank > *best_rank) {
            best = Some((rank, variant));
        }
    }

    let (_, variant) = best.ok_or(ExtractorError::NoAvailableVariant)?;
    debug!(%variant, "Selected variant");
    Ok(variant)
}
