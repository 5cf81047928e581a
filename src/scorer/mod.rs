//! Engagement scorer
//!
//! Scores a batch of records from their readers' comments in three rounds of
//! requests:
//! 1. One combined comment-count query for the whole batch
//! 2. One top-level comment request per record that has comments
//! 3. One reply request per commented-on comment, fanned out across all records
//!
//! Results of each fan-out are matched back to their records by position,
//! never by anything in the response body.

mod rules;

pub use crate::config::MissingCountPolicy;
pub use rules::score_comments;

use crate::gateway::{gather, Gateway};
use crate::site::{Record, Site};
use crate::{HarvestError, Result, Stage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Scores record batches against one site's comment API
pub struct EngagementScorer<'a> {
    gateway: &'a Gateway,
    site: Arc<dyn Site>,
    policy: MissingCountPolicy,
}

impl<'a> EngagementScorer<'a> {
    pub fn new(gateway: &'a Gateway, site: Arc<dyn Site>, policy: MissingCountPolicy) -> Self {
        Self {
            gateway,
            site,
            policy,
        }
    }

    /// Fills in `comment_count` and `score` for every record of a batch
    ///
    /// Records without comments are never fanned out and keep a zero score.
    pub async fn score(&self, mut records: Vec<Record>) -> Result<Vec<Record>> {
        if records.is_empty() {
            return Ok(records);
        }

        self.populate_counts(&mut records).await?;

        // An article rediscovered within the batch is fetched once, by its
        // first occurrence
        let mut seen = HashSet::new();
        let owners: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.comment_count > 0)
            .filter(|(_, record)| seen.insert(record.identifier.clone()))
            .map(|(index, _)| index)
            .collect();

        for record in records.iter().filter(|record| record.comment_count == 0) {
            tracing::debug!("Article {} has no comments, skipped", record.identifier);
        }

        // Level 1: top-level comments
        let futures = owners
            .iter()
            .map(|&index| {
                let site = Arc::clone(&self.site);
                let request = site.comment_request(&records[index]);
                self.gateway
                    .fetch_parsed(request, Stage::CommentFanout, move |body| {
                        site.score_response(body)
                    })
            })
            .collect::<Vec<_>>();
        let first_level = gather(futures, self.gateway.max_in_flight()).await?;

        // Level 2: replies, each tagged with the record that owns it
        let mut reply_owners = Vec::new();
        let mut reply_requests = Vec::new();
        for (&owner, partial) in owners.iter().zip(&first_level) {
            records[owner].score = partial.score;
            for (comment_id, reply_count) in &partial.replies {
                if let Some(request) =
                    self.site
                        .reply_request(&records[owner], comment_id, *reply_count)
                {
                    reply_owners.push(owner);
                    reply_requests.push(request);
                }
            }
        }

        let futures = reply_requests
            .into_iter()
            .map(|request| {
                let site = Arc::clone(&self.site);
                self.gateway
                    .fetch_parsed(request, Stage::ReplyFanout, move |body| {
                        site.score_response(body)
                    })
            })
            .collect::<Vec<_>>();
        let second_level = gather(futures, self.gateway.max_in_flight()).await?;

        // Replies of replies are not followed
        for (owner, partial) in reply_owners.into_iter().zip(second_level) {
            records[owner].score += partial.score;
        }

        let owned: HashMap<String, i64> = owners
            .iter()
            .map(|&owner| (records[owner].identifier.clone(), records[owner].score))
            .collect();
        for record in records.iter_mut() {
            if let Some(&score) = owned.get(&record.identifier) {
                record.score = score;
            }
        }

        for &owner in &owners {
            let record = &records[owner];
            tracing::debug!(
                "Article {} scored {} ({})",
                record.identifier,
                record.score,
                record.title
            );
        }

        Ok(records)
    }

    /// Runs the combined count query and copies counts onto the records
    async fn populate_counts(&self, records: &mut [Record]) -> Result<()> {
        let site = Arc::clone(&self.site);
        let request = site.count_request(records);
        let counts = self
            .gateway
            .fetch_parsed(request, Stage::CountQuery, move |body| {
                site.parse_count_response(body)
            })
            .await?;

        let distinct = records
            .iter()
            .map(|record| record.identifier.as_str())
            .collect::<HashSet<_>>()
            .len();
        if counts.len() != distinct {
            tracing::error!(
                "Comment count response has {} entries for {} articles",
                counts.len(),
                distinct
            );
        }

        for record in records.iter_mut() {
            match counts.get(&record.identifier) {
                Some(&count) => record.comment_count = count,
                None => match self.policy {
                    MissingCountPolicy::Zero => {
                        tracing::warn!(
                            "No comment count returned for {}, treating as 0",
                            record.identifier
                        );
                        record.comment_count = 0;
                    }
                    MissingCountPolicy::Fail => {
                        return Err(HarvestError::DataShape {
                            stage: Stage::CountQuery,
                            message: format!(
                                "no comment count returned for {} ({})",
                                record.identifier, record.url
                            ),
                        });
                    }
                },
            }
        }

        Ok(())
    }
}
