//! Vote aggregation for one category.

use serde::Serialize;

use crate::models::{Category, Vote};

/// One candidate's vote count within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub candidate: String,
    pub votes: usize,
}

/// Count votes per candidate in `category`, highest first.
///
/// Ties keep the order in which candidates first appear in `votes`.
pub fn tally(votes: &[Vote], category: Category) -> Vec<Standing> {
    let mut standings: Vec<Standing> = Vec::new();

    for vote in votes.iter().filter(|vote| vote.category == category) {
        match standings
            .iter_mut()
            .find(|standing| standing.candidate == vote.candidate)
        {
            Some(standing) => standing.votes += 1,
            None => standings.push(Standing {
                candidate: vote.candidate.clone(),
                votes: 1,
            }),
        }
    }

    standings.sort_by(|a, b| b.votes.cmp(&a.votes));
    standings
}

/// The candidate `voter` picked in `category`, if any.
pub fn vote_of<'a>(votes: &'a [Vote], voter: &str, category: Category) -> Option<&'a str> {
    votes
        .iter()
        .find(|vote| vote.voter == voter && vote.category == category)
        .map(|vote| vote.candidate.as_str())
}
