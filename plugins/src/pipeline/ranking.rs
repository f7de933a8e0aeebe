use std::cmp::Ordering;

use super::record::{Product, RankedProduct};

/// Popularity score: rating weighted by review volume.
pub fn score(product: &Product) -> f64 {
    product.rating * f64::from(product.review_count)
}

/// Pick the best `take` products, rank 1 first.
///
/// Sorted by score descending; ties go to the cheaper product, then to the
/// title. Listings with a non-finite rating or price are dropped.
pub fn rank_products(candidates: Vec<Product>, take: usize) -> Vec<RankedProduct> {
    let mut scored: Vec<(f64, Product)> = candidates
        .into_iter()
        .filter(|p| p.rating.is_finite() && p.price.is_finite())
        .map(|p| (score(&p), p))
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.total_cmp(sa)
            .then_with(|| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal))
            .then_with(|| a.title.cmp(&b.title))
    });

    scored
        .into_iter()
        .take(take)
        .enumerate()
        .map(|(idx, (score, product))| RankedProduct {
            rank: idx + 1,
            score,
            product,
        })
        .collect()
}

/// Presentation order for the video: worst of the selection first.
pub fn countdown_order(ranked: &[RankedProduct]) -> Vec<&RankedProduct> {
    let mut ordered: Vec<&RankedProduct> = ranked.iter().collect();
    ordered.sort_by(|a, b| b.rank.cmp(&a.rank));
    ordered
}
