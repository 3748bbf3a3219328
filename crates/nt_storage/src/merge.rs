use std::collections::HashMap;

use nt_core::{ArticleStatus, CanonicalArticle, MergeReport};

/// Merges `incoming` into a copy of `current` and returns the new collection.
///
/// An unseen id is inserted. A seen id is replaced wholesale when the incoming
/// freshness is equal to or newer than the kept one, otherwise the kept record
/// survives untouched. Duplicates inside one batch go through the same rule in
/// batch order, so on equal freshness the last one wins. `current` is never
/// mutated, which keeps earlier snapshots valid.
pub fn merge_batch(current: &[CanonicalArticle], incoming: Vec<CanonicalArticle>) -> Vec<CanonicalArticle> {
    merge_with_report(current, incoming).0
}

pub fn merge_with_report(
    current: &[CanonicalArticle],
    incoming: Vec<CanonicalArticle>,
) -> (Vec<CanonicalArticle>, MergeReport) {
    let mut merged: Vec<CanonicalArticle> = current.to_vec();
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, article)| (article.id.clone(), i))
        .collect();
    let mut report = MergeReport::default();

    for article in incoming {
        let status = match index.get(&article.id) {
            Some(&slot) => {
                let existing = &merged[slot];
                if article.freshness() < existing.freshness() || *existing == article {
                    ArticleStatus::Unchanged
                } else {
                    merged[slot] = article;
                    ArticleStatus::Updated
                }
            }
            None => {
                index.insert(article.id.clone(), merged.len());
                merged.push(article);
                ArticleStatus::New
            }
        };
        report.record(status);
    }

    sort_by_freshness(&mut merged);
    (merged, report)
}

/// Stable sort, freshest first.
pub fn sort_by_freshness(articles: &mut [CanonicalArticle]) {
    articles.sort_by(|a, b| b.freshness().cmp(&a.freshness()));
}
