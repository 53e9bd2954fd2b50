use facegate_vision::Embedding;

use crate::store::Identity;

/// A probe that satisfied the acceptance threshold.
#[derive(Debug, Clone)]
pub struct Match {
    pub identity: Identity,
    pub score: f32,
}

/// Scan all stored identities for the best cosine-similarity match against
/// the probe. Returns a hit only if the best score meets `threshold`.
///
/// O(n) over the store, which is fine at kiosk scale; this linear scan is
/// the scaling limit if the store ever grows past a few thousand identities.
/// Exact ties break to the lexicographically smallest name so matching is
/// deterministic.
pub fn best_match(records: &[Identity], probe: &Embedding, threshold: f32) -> Option<Match> {
    let mut best: Option<Match> = None;
    for identity in records {
        let score = identity.embedding.similarity(probe);
        if score < threshold {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => {
                score > current.score
                    || (score == current.score && identity.name < current.identity.name)
            }
        };
        if better {
            best = Some(Match {
                identity: identity.clone(),
                score,
            });
        }
    }
    best
}
