//! In-process implementation of every store trait, plus mailer and captcha
//! doubles. Ordering rules mirror the Postgres queries.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::admin::repo::MetricsStore;
use crate::admin::repo_types::{AdminMetrics, METRICS_DAYS};
use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::{Bio, LoginToken, User, UserProfile};
use crate::captcha::CaptchaVerifier;
use crate::comments::repo::CommentStore;
use crate::comments::repo_types::{Comment, CommentView, NewComment};
use crate::mailer::Mailer;
use crate::submissions::ranking::SortMode;
use crate::submissions::repo::SubmissionStore;
use crate::submissions::repo_types::{NewSubmission, RankedSubmission, Submission};
use crate::titles::TitleFetcher;
use crate::votes::ledger::{VoteOutcome, VoteTarget};
use crate::votes::repo::VoteStore;
use crate::votes::repo_types::{VoteCounts, VotedSubmission};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    bios: HashMap<String, Bio>,
    admins: HashSet<String>,
    tokens: HashMap<String, LoginToken>,
    submissions: Vec<Submission>,
    comments: Vec<Comment>,
    votes: HashMap<VoteTarget, HashMap<String, (bool, i64)>>,
    vote_times: HashMap<(VoteTarget, String), OffsetDateTime>,
    last_stamp: Option<OffsetDateTime>,
    vote_seq: i64,
}

impl Tables {
    /// Strictly increasing timestamps so creation order is never a tie.
    fn stamp(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(next);
        next
    }

    fn counts(&self, target: VoteTarget) -> VoteCounts {
        let mut counts = VoteCounts::default();
        for (positive, _) in self.votes.get(&target).into_iter().flat_map(|m| m.values()) {
            if *positive {
                counts.upvotes += 1;
            } else {
                counts.downvotes += 1;
            }
        }
        counts
    }

    fn ranked(&self, s: &Submission) -> RankedSubmission {
        let counts = self.counts(VoteTarget::Submission(s.id));
        RankedSubmission {
            id: s.id,
            username: s.username.clone(),
            title: s.title.clone(),
            link: s.link.clone(),
            body: s.body.clone(),
            created_at: s.created_at,
            upvotes: counts.upvotes,
            downvotes: counts.downvotes,
            score: counts.score(),
        }
    }

    fn user_with_score(&self, user: &User) -> User {
        let score = self
            .submissions
            .iter()
            .filter(|s| s.username == user.username)
            .map(|s| self.counts(VoteTarget::Submission(s.id)).score())
            .sum();
        User {
            score,
            ..user.clone()
        }
    }

    fn page(
        &self,
        filter: impl Fn(&Submission) -> bool,
        sort: SortMode,
        limit: i64,
        offset: i64,
    ) -> Vec<RankedSubmission> {
        let mut rows: Vec<_> = self
            .submissions
            .iter()
            .filter(|s| !s.flagged && filter(s))
            .map(|s| self.ranked(s))
            .collect();
        rows.sort_by(|a, b| {
            let newest = b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id));
            match sort {
                SortMode::Latest => newest,
                SortMode::Oldest => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
                SortMode::Best => b.score.cmp(&a.score).then(newest),
            }
        });
        rows.into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub async fn seed_submission(&self, author: &str, title: &str, flagged: bool) -> Uuid {
        let mut t = self.tables();
        let created_at = t.stamp();
        let id = Uuid::new_v4();
        t.submissions.push(Submission {
            id,
            username: author.to_string(),
            title: title.to_string(),
            link: format!("https://example.com/{id}"),
            body: None,
            flagged,
            created_at,
        });
        id
    }

    pub async fn seed_comment(
        &self,
        submission: Uuid,
        parent: Option<Uuid>,
        author: &str,
        content: &str,
    ) -> Uuid {
        let mut t = self.tables();
        let created_at = t.stamp();
        let id = Uuid::new_v4();
        t.comments.push(Comment {
            id,
            in_response_to: submission,
            parent_comment: parent,
            author: author.to_string(),
            content: content.to_string(),
            flagged: false,
            created_at,
        });
        id
    }

    pub fn grant_admin(&self, username: &str) {
        self.tables().admins.insert(username.to_string());
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn replace_login_token(&self, token: &LoginToken) -> anyhow::Result<()> {
        let mut t = self.tables();
        t.tokens.retain(|_, live| live.username != token.username);
        t.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn take_login_token(&self, token: &str) -> anyhow::Result<Option<LoginToken>> {
        Ok(self.tables().tokens.remove(token))
    }

    async fn find_or_create_user(
        &self,
        username: &str,
        email: &str,
        registered_ip: &str,
    ) -> anyhow::Result<Option<(User, bool)>> {
        let mut t = self.tables();
        // usernames and emails are both unique
        let created = !t.users.contains_key(username)
            && !t.users.values().any(|u| u.email == email);
        if created {
            let created_at = t.stamp();
            t.users.insert(
                username.to_string(),
                User {
                    username: username.to_string(),
                    email: email.to_string(),
                    created_at,
                    registered_ip: registered_ip.to_string(),
                    score: 0,
                },
            );
        }
        Ok(t
            .users
            .get(username)
            .filter(|u| u.email == email)
            .map(|u| (t.user_with_score(u), created)))
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables();
        Ok(t.users.get(username).map(|u| t.user_with_score(u)))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables();
        Ok(t.users
            .values()
            .find(|u| u.email == email)
            .map(|u| t.user_with_score(u)))
    }

    async fn find_profile(&self, username: &str) -> anyhow::Result<Option<UserProfile>> {
        let t = self.tables();
        Ok(t.users.get(username).map(|u| UserProfile {
            user: t.user_with_score(u),
            bio: t.bios.get(username).cloned(),
            is_admin: t.admins.contains(username),
        }))
    }

    async fn upsert_bio(&self, bio: &Bio) -> anyhow::Result<()> {
        self.tables().bios.insert(bio.username.clone(), bio.clone());
        Ok(())
    }

    async fn is_admin(&self, username: &str) -> anyhow::Result<bool> {
        Ok(self.tables().admins.contains(username))
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn cast_vote(
        &self,
        target: VoteTarget,
        voter: &str,
        positive: bool,
    ) -> anyhow::Result<VoteOutcome> {
        let mut t = self.tables();
        t.vote_seq += 1;
        let seq = t.vote_seq;
        let at = t.stamp();
        let votes = t.votes.entry(target).or_default();
        let outcome = match votes.get_mut(voter) {
            None => {
                votes.insert(voter.to_string(), (positive, seq));
                VoteOutcome::Inserted
            }
            Some((existing, _)) if *existing == positive => VoteOutcome::Rejected,
            Some(vote) => {
                *vote = (positive, seq);
                VoteOutcome::Flipped
            }
        };
        if outcome.succeeded() {
            t.vote_times.insert((target, voter.to_string()), at);
        }
        Ok(outcome)
    }

    async fn find_vote(&self, target: VoteTarget, voter: &str) -> anyhow::Result<Option<bool>> {
        Ok(self
            .tables()
            .votes
            .get(&target)
            .and_then(|m| m.get(voter))
            .map(|(positive, _)| *positive))
    }

    async fn count_votes(&self, target: VoteTarget) -> anyhow::Result<VoteCounts> {
        Ok(self.tables().counts(target))
    }

    async fn votes_by_user(&self, voter: &str, limit: i64) -> anyhow::Result<Vec<VotedSubmission>> {
        let t = self.tables();
        let mut voted: Vec<_> = t
            .submissions
            .iter()
            .filter_map(|s| {
                let (positive, seq) = t.votes.get(&VoteTarget::Submission(s.id))?.get(voter)?;
                Some((
                    *seq,
                    VotedSubmission {
                        id: s.id,
                        title: s.title.clone(),
                        link: s.link.clone(),
                        body: s.body.clone(),
                        created_at: s.created_at,
                        username: s.username.clone(),
                        is_upvoted: *positive,
                    },
                ))
            })
            .collect();
        voted.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(voted
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, v)| v)
            .collect())
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create(&self, new: &NewSubmission) -> anyhow::Result<Submission> {
        let mut t = self.tables();
        let created_at = t.stamp();
        let submission = Submission {
            id: Uuid::new_v4(),
            username: new.username.clone(),
            title: new.title.clone(),
            link: new.link.clone(),
            body: new.body.clone(),
            flagged: false,
            created_at,
        };
        t.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Submission>> {
        Ok(self.tables().submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn set_flagged(&self, id: Uuid, flagged: bool) -> anyhow::Result<bool> {
        let mut t = self.tables();
        match t.submissions.iter_mut().find(|s| s.id == id) {
            Some(s) => {
                s.flagged = flagged;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_unflagged(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables();
        let before = t.submissions.len();
        t.submissions.retain(|s| s.id != id || s.flagged);
        let deleted = t.submissions.len() < before;
        if deleted {
            let target = VoteTarget::Submission(id);
            t.votes.remove(&target);
            t.vote_times.retain(|(voted, _), _| *voted != target);
            t.comments.retain(|c| c.in_response_to != id);
        }
        Ok(deleted)
    }

    async fn list(
        &self,
        sort: SortMode,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>> {
        Ok(self.tables().page(|_| true, sort, limit, offset))
    }

    async fn list_by_user(
        &self,
        username: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>> {
        Ok(self
            .tables()
            .page(|s| s.username == username, SortMode::Latest, limit, offset))
    }

    async fn search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>> {
        let needle = query.to_lowercase();
        let matches = |s: &Submission| {
            s.title.to_lowercase().contains(&needle)
                || s
                    .body
                    .as_deref()
                    .is_some_and(|b| b.to_lowercase().contains(&needle))
        };
        Ok(self.tables().page(matches, SortMode::Latest, limit, offset))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert(&self, new: &NewComment) -> anyhow::Result<Comment> {
        let mut t = self.tables();
        let created_at = t.stamp();
        let comment = Comment {
            id: Uuid::new_v4(),
            in_response_to: new.in_response_to,
            parent_comment: new.parent_comment,
            author: new.author.clone(),
            content: new.content.clone(),
            flagged: false,
            created_at,
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        Ok(self.tables().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_for_submission(
        &self,
        submission: Uuid,
        context_voter: Option<&str>,
    ) -> anyhow::Result<Vec<CommentView>> {
        let t = self.tables();
        let mut rows: Vec<_> = t
            .comments
            .iter()
            .filter(|c| c.in_response_to == submission)
            .map(|c| {
                let target = VoteTarget::Comment(c.id);
                let counts = t.counts(target);
                let own = context_voter
                    .and_then(|voter| t.votes.get(&target)?.get(voter))
                    .map(|(positive, _)| *positive);
                CommentView {
                    id: c.id,
                    in_response_to: c.in_response_to,
                    parent_comment: c.parent_comment,
                    author: c.author.clone(),
                    content: c.content.clone(),
                    flagged: c.flagged,
                    created_at: c.created_at,
                    upvotes: counts.upvotes,
                    downvotes: counts.downvotes,
                    has_upvoted: own == Some(true),
                    has_downvoted: own == Some(false),
                }
            })
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables();
        let before = t.comments.len();
        t.comments.retain(|c| c.id != id && c.parent_comment != Some(id));
        let target = VoteTarget::Comment(id);
        t.votes.remove(&target);
        t.vote_times.retain(|(voted, _), _| *voted != target);
        Ok(t.comments.len() < before)
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn metrics(&self, now: OffsetDateTime) -> anyhow::Result<AdminMetrics> {
        let t = self.tables();
        let week_ago = now - Duration::days(METRICS_DAYS as i64);
        let recent = |at: OffsetDateTime| at > week_ago && at <= now;

        let mut posts_per_day = [0; METRICS_DAYS];
        for s in t.submissions.iter().filter(|s| recent(s.created_at)) {
            let day = ((now - s.created_at).whole_seconds() / 86_400) as usize;
            if let Some(slot) = posts_per_day.get_mut(day) {
                *slot += 1;
            }
        }

        let mut active: HashSet<&str> = HashSet::new();
        active.extend(
            t.submissions
                .iter()
                .filter(|s| recent(s.created_at))
                .map(|s| s.username.as_str()),
        );
        active.extend(
            t.comments
                .iter()
                .filter(|c| recent(c.created_at))
                .map(|c| c.author.as_str()),
        );
        active.extend(
            t.vote_times
                .iter()
                .filter(|(_, at)| recent(**at))
                .map(|((_, voter), _)| voter.as_str()),
        );

        Ok(AdminMetrics {
            posts_per_day,
            total_submissions: t.submissions.len() as i64,
            total_users: t.users.len() as i64,
            active_users: active.len() as i64,
        })
    }
}

/// Keeps every (recipient, token) pair handed to it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(recipient, _)| recipient == to)
            .map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_magic_link(&self, to: &str, token: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), token.to_string()));
        Ok(())
    }
}

/// Accepts exactly one proof string.
pub struct FixedCaptcha(pub &'static str);

#[async_trait]
impl CaptchaVerifier for FixedCaptcha {
    async fn verify(&self, proof: &str) -> anyhow::Result<bool> {
        Ok(proof == self.0)
    }
}

/// Serves titles from a fixed map; unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct FixedTitles {
    pages: Mutex<HashMap<String, Option<String>>>,
}

impl FixedTitles {
    pub fn serve(&self, url: &str, title: Option<&str>) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), title.map(str::to_string));
    }
}

#[async_trait]
impl TitleFetcher for FixedTitles {
    async fn fetch_title(&self, url: &str) -> anyhow::Result<Option<String>> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("connection refused"))
    }
}
