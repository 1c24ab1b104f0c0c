//! Task search across a workspace.
//!
//! Names are matched by substring first and by fuzzy rank second; with
//! comment search on, tasks whose names miss are checked for the query in
//! their comments. The scan runs under a [`Deadline`] and keeps whatever it
//! found when the budget runs out.

use serde::Serialize;

use crate::api::models::Task;
use crate::api::{ApiError, ClickUpClient, TaskQuery, Transport};
use crate::fanout::{run_bounded, Deadline, DEFAULT_CONCURRENCY};
use crate::status_match::fuzzy_rank;
use crate::taskid::TaskIdentifier;

/// Pages of `GET /team/{id}/task` scanned per query.
pub const MAX_PAGES: u32 = 10;

/// Tasks per page whose comments are checked.
pub const COMMENT_SCAN_LIMIT: usize = 100;

/// Shortest word tried when a multi-word query finds nothing.
const MIN_WORD_LEN: usize = 3;

/// How a task matched, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Name,
    Fuzzy,
    Comment,
}

impl MatchKind {
    pub fn label(&self) -> &'static str {
        match self {
            MatchKind::Name => "name",
            MatchKind::Fuzzy => "fuzzy",
            MatchKind::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredTask {
    pub task: Task,
    pub kind: MatchKind,
    /// Fuzzy distance; zero for the other kinds.
    pub rank: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub comments: bool,
    pub max_pages: u32,
    pub concurrency: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            comments: false,
            max_pages: MAX_PAGES,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Progress notifications for the caller's spinner or log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    PageScanned { page: u32, tasks: usize },
    CheckingComments { tasks: usize },
    TryingWords,
}

#[derive(Debug, Default)]
pub struct SearchReport {
    pub results: Vec<ScoredTask>,
    pub timed_out: bool,
}

/// Score a task name against a lowercased query.
pub fn score_name(query: &str, name: &str) -> Option<(MatchKind, usize)> {
    let name = name.to_lowercase();
    if name.contains(query) {
        return Some((MatchKind::Name, 0));
    }
    fuzzy_rank(query, &name).map(|rank| (MatchKind::Fuzzy, rank))
}

/// Keep the best match per task and order by kind, then fuzzy rank.
/// Equal results keep their discovery order.
pub fn rank_results(scored: Vec<ScoredTask>) -> Vec<ScoredTask> {
    let mut best: Vec<ScoredTask> = Vec::with_capacity(scored.len());
    for candidate in scored {
        match best.iter_mut().find(|kept| kept.task.id == candidate.task.id) {
            Some(kept) => {
                if (candidate.kind, candidate.rank) < (kept.kind, kept.rank) {
                    *kept = candidate;
                }
            }
            None => best.push(candidate),
        }
    }
    best.sort_by_key(|s| (s.kind, s.rank));
    best
}

/// Search the workspace, retrying word by word when a multi-word query
/// finds nothing.
///
/// Only a failure of the first scan is an error. A failing word scan ends
/// the fallback and the words already searched are still reported.
pub fn search<T: Transport>(
    client: &ClickUpClient<T>,
    team_id: &str,
    query: &str,
    options: SearchOptions,
    deadline: Deadline,
    on_event: &dyn Fn(SearchEvent),
) -> Result<SearchReport, ApiError> {
    let mut report = scan(client, team_id, query, options, deadline, on_event)?;

    let words: Vec<&str> = query.split_whitespace().collect();
    if report.results.is_empty() && words.len() > 1 && !report.timed_out {
        on_event(SearchEvent::TryingWords);
        let mut combined = Vec::new();
        for word in words.iter().filter(|w| w.chars().count() >= MIN_WORD_LEN) {
            if deadline.is_expired() {
                report.timed_out = true;
                break;
            }
            let partial = match scan(client, team_id, word, options, deadline, on_event) {
                Ok(partial) => partial,
                Err(e) => {
                    tracing::debug!(word = %word, error = %e, "word search failed");
                    break;
                }
            };
            report.timed_out |= partial.timed_out;
            combined.extend(partial.results);
        }
        report.results = rank_results(combined);
    }

    Ok(report)
}

fn scan<T: Transport>(
    client: &ClickUpClient<T>,
    team_id: &str,
    query: &str,
    options: SearchOptions,
    deadline: Deadline,
    on_event: &dyn Fn(SearchEvent),
) -> Result<SearchReport, ApiError> {
    let query = query.to_lowercase();
    let mut scored = Vec::new();
    let mut timed_out = false;

    for page in 0..options.max_pages {
        if deadline.is_expired() {
            timed_out = true;
            break;
        }

        let request = TaskQuery {
            page,
            include_closed: true,
            order_by: Some("updated".to_string()),
            ..TaskQuery::default()
        };
        let tasks_page = match client.team_tasks(team_id, &request, Some(deadline)) {
            Ok(tasks_page) => tasks_page,
            Err(ApiError::Cancelled) => {
                timed_out = true;
                break;
            }
            Err(e) => return Err(e),
        };
        if tasks_page.tasks.is_empty() {
            break;
        }
        let page_size = tasks_page.tasks.len();
        let last_page = tasks_page.last_page == Some(true);

        let mut unmatched = Vec::new();
        for task in tasks_page.tasks {
            match score_name(&query, &task.name) {
                Some((kind, rank)) => scored.push(ScoredTask { task, kind, rank }),
                None => unmatched.push(task),
            }
        }

        if options.comments && !unmatched.is_empty() {
            unmatched.truncate(COMMENT_SCAN_LIMIT);
            on_event(SearchEvent::CheckingComments {
                tasks: unmatched.len(),
            });
            let checked = run_bounded(&unmatched, options.concurrency, Some(deadline), |task| {
                comments_mention(client, task, &query, deadline)
            });
            timed_out |= checked.timed_out;
            for (task, hit) in unmatched.into_iter().zip(checked.results) {
                if hit == Some(true) {
                    scored.push(ScoredTask {
                        task,
                        kind: MatchKind::Comment,
                        rank: 0,
                    });
                }
            }
        }

        on_event(SearchEvent::PageScanned {
            page: page + 1,
            tasks: page_size,
        });
        if last_page || timed_out {
            break;
        }
    }

    Ok(SearchReport {
        results: rank_results(scored),
        timed_out,
    })
}

fn comments_mention<T: Transport>(
    client: &ClickUpClient<T>,
    task: &Task,
    query: &str,
    deadline: Deadline,
) -> bool {
    match client.task_comments(&TaskIdentifier::native(&task.id), Some(deadline)) {
        Ok(comments) => comments
            .iter()
            .any(|c| c.comment_text.to_lowercase().contains(query)),
        Err(e) => {
            tracing::debug!(task = %task.id, error = %e, "comment lookup failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthenticatedTransport, HttpRequest, HttpResponse};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Answers by URL fragment so concurrent comment lookups stay deterministic.
    struct Routed {
        routes: Vec<(&'static str, String)>,
    }

    impl Transport for Routed {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.routes
                .iter()
                .find(|(fragment, _)| request.url().contains(fragment))
                .map(|(_, body)| HttpResponse::new(200, body.clone()))
                .ok_or_else(|| ApiError::Network(format!("no route for {}", request.url())))
        }
    }

    /// Serves its routes for the first `allowed` requests, then drops the connection.
    struct Flaky {
        routed: Routed,
        allowed: AtomicUsize,
    }

    impl Transport for Flaky {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            let spent = self
                .allowed
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err();
            if spent {
                return Err(ApiError::Network("connection reset".into()));
            }
            self.routed.send(request)
        }
    }

    fn client(routes: Vec<(&'static str, String)>) -> ClickUpClient<Arc<Routed>> {
        ClickUpClient::new(AuthenticatedTransport::new(Arc::new(Routed { routes }), "tok"))
            .with_base_url("http://fake/api/v2")
    }

    fn workspace() -> Vec<(&'static str, String)> {
        let page = json!({
            "tasks": [
                {"id": "t1", "name": "Fix login form"},
                {"id": "t2", "name": "Billing export"},
                {"id": "t3", "name": "Onboarding email"}
            ],
            "last_page": true
        });
        vec![
            ("task/t2/comment", json!({"comments": [{"id": "c1", "comment_text": "blocked on LOGIN redirect"}]}).to_string()),
            ("task/t3/comment", json!({"comments": []}).to_string()),
            ("team/9/task", page.to_string()),
        ]
    }

    fn task(id: &str, name: &str) -> Task {
        serde_json::from_value(json!({"id": id, "name": name})).unwrap()
    }

    fn scored(id: &str, kind: MatchKind, rank: usize) -> ScoredTask {
        ScoredTask {
            task: task(id, id),
            kind,
            rank,
        }
    }

    #[test]
    fn test_score_name() {
        assert_eq!(score_name("login", "Fix LOGIN form"), Some((MatchKind::Name, 0)));
        assert!(matches!(score_name("lgn", "Login"), Some((MatchKind::Fuzzy, _))));
        assert_eq!(score_name("xyz", "Login"), None);
    }

    #[test]
    fn test_rank_results_orders_and_dedupes() {
        let ranked = rank_results(vec![
            scored("c", MatchKind::Comment, 0),
            scored("f2", MatchKind::Fuzzy, 4),
            scored("n", MatchKind::Name, 0),
            scored("f1", MatchKind::Fuzzy, 1),
            scored("c", MatchKind::Fuzzy, 2),
        ]);
        let ids: Vec<_> = ranked.iter().map(|s| s.task.id.as_str()).collect();
        assert_eq!(ids, vec!["n", "f1", "c", "f2"]);
        assert_eq!(ranked[2].kind, MatchKind::Fuzzy);
    }

    #[test]
    fn test_rank_results_is_stable_for_ties() {
        let ranked = rank_results(vec![
            scored("b", MatchKind::Name, 0),
            scored("a", MatchKind::Name, 0),
        ]);
        assert_eq!(ranked[0].task.id, "b");
    }

    #[test]
    fn test_search_matches_names() {
        let client = client(workspace());
        let report = search(
            &client,
            "9",
            "login",
            SearchOptions::default(),
            Deadline::after(Duration::from_secs(10)),
            &|_| {},
        )
        .unwrap();
        assert!(!report.timed_out);
        let ids: Vec<_> = report.results.iter().map(|s| s.task.id.as_str()).collect();
        assert_eq!(ids, vec!["t1"]);
    }

    #[test]
    fn test_search_checks_comments_of_unmatched_tasks() {
        let client = client(workspace());
        let events = std::sync::Mutex::new(Vec::new());
        let options = SearchOptions {
            comments: true,
            ..SearchOptions::default()
        };
        let report = search(
            &client,
            "9",
            "login",
            options,
            Deadline::after(Duration::from_secs(10)),
            &|event| events.lock().unwrap().push(event),
        )
        .unwrap();

        let found: Vec<_> = report
            .results
            .iter()
            .map(|s| (s.task.id.as_str(), s.kind))
            .collect();
        assert_eq!(found, vec![("t1", MatchKind::Name), ("t2", MatchKind::Comment)]);
        assert!(events
            .lock()
            .unwrap()
            .contains(&SearchEvent::CheckingComments { tasks: 2 }));
    }

    #[test]
    fn test_search_falls_back_to_words() {
        let client = client(workspace());
        let events = std::sync::Mutex::new(Vec::new());
        let report = search(
            &client,
            "9",
            "quarterly billing",
            SearchOptions::default(),
            Deadline::after(Duration::from_secs(10)),
            &|event| events.lock().unwrap().push(event),
        )
        .unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].task.id, "t2");
        assert!(events.lock().unwrap().contains(&SearchEvent::TryingWords));
    }

    #[test]
    fn test_failed_word_scan_keeps_earlier_words() {
        let flaky = Flaky {
            routed: Routed { routes: workspace() },
            allowed: AtomicUsize::new(2),
        };
        let client = ClickUpClient::new(AuthenticatedTransport::new(Arc::new(flaky), "tok"))
            .with_base_url("http://fake/api/v2");

        // full query, then "billing", then "quarterly" hits the dropped connection
        let report = search(
            &client,
            "9",
            "billing quarterly",
            SearchOptions::default(),
            Deadline::after(Duration::from_secs(10)),
            &|_| {},
        )
        .unwrap();
        let ids: Vec<_> = report.results.iter().map(|s| s.task.id.as_str()).collect();
        assert_eq!(ids, vec!["t2"]);
    }

    #[test]
    fn test_failed_first_scan_is_an_error() {
        let flaky = Flaky {
            routed: Routed { routes: workspace() },
            allowed: AtomicUsize::new(0),
        };
        let client = ClickUpClient::new(AuthenticatedTransport::new(Arc::new(flaky), "tok"))
            .with_base_url("http://fake/api/v2");
        let err = search(
            &client,
            "9",
            "billing",
            SearchOptions::default(),
            Deadline::after(Duration::from_secs(10)),
            &|_| {},
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[test]
    fn test_expired_deadline_reports_timeout() {
        let client = client(workspace());
        let report = search(
            &client,
            "9",
            "login",
            SearchOptions::default(),
            Deadline::after(Duration::ZERO),
            &|_| {},
        )
        .unwrap();
        assert!(report.timed_out);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_match_kind_labels() {
        assert_eq!(MatchKind::Comment.label(), "comment");
        assert_eq!(serde_json::to_value(MatchKind::Fuzzy).unwrap(), json!("fuzzy"));
    }
}
