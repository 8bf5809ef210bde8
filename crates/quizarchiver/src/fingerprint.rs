//! Digest of the last-modified state of a quiz and its attempts.

use serde::Serialize;

use crate::error::RepositoryError;
use crate::host::QuizRepository;
use crate::storage::sha256_hex;

/// Inputs in hashing order. Field order is part of the digest.
#[derive(Debug, Serialize)]
struct FingerprintInput {
    quiz_timemodified: i64,
    attempts_timemodified: Option<i64>,
}

/// Hex SHA-256 over the quiz's modification time and the latest modification
/// time of any of its attempts (`null` when there are none).
pub fn compute_fingerprint(quiz_timemodified: i64, attempts_timemodified: Option<i64>) -> String {
    let input = FingerprintInput {
        quiz_timemodified,
        attempts_timemodified,
    };
    // Serializing a struct of integers cannot fail.
    let encoded = serde_json::to_vec(&input).unwrap_or_default();
    sha256_hex(&encoded)
}

pub fn fingerprint(repo: &dyn QuizRepository, cm_id: i64) -> Result<String, RepositoryError> {
    let cm = repo.course_module(cm_id)?;
    let quiz = repo.quiz(cm.quiz_id)?;
    let latest_attempt = repo
        .attempts(quiz.id)?
        .iter()
        .map(|a| a.time_modified)
        .max();
    Ok(compute_fingerprint(quiz.time_modified, latest_attempt))
}
