use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use shared::domain::{
    BlogPost, CaffeineInfo, HeadingConfig, InfoPanelConfig, Principal, ServiceCapabilities,
    UserProfile, WebLink,
};

const BLOG_POSTS_STALE_TIME: Duration = Duration::from_secs(5 * 60);
const VISIT_COUNT_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Logical resource names the cache is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    CurrentUserProfile,
    IsCallerAdmin,
    AdminPrincipals,
    VisitCount,
    HeadingConfig,
    BlogPosts,
    WebLinks,
    CaffeineInfo,
    InfoPanelConfig,
    Capabilities,
}

impl QueryKey {
    pub const ALL: [QueryKey; 10] = [
        QueryKey::CurrentUserProfile,
        QueryKey::IsCallerAdmin,
        QueryKey::AdminPrincipals,
        QueryKey::VisitCount,
        QueryKey::HeadingConfig,
        QueryKey::BlogPosts,
        QueryKey::WebLinks,
        QueryKey::CaffeineInfo,
        QueryKey::InfoPanelConfig,
        QueryKey::Capabilities,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CurrentUserProfile => "currentUserProfile",
            Self::IsCallerAdmin => "isCallerAdmin",
            Self::AdminPrincipals => "adminPrincipals",
            Self::VisitCount => "visitCount",
            Self::HeadingConfig => "headingConfig",
            Self::BlogPosts => "blogPosts",
            Self::WebLinks => "webLinks",
            Self::CaffeineInfo => "caffeineInfo",
            Self::InfoPanelConfig => "caffeineInfoConfig",
            Self::Capabilities => "capabilities",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryData {
    Profile(Option<UserProfile>),
    Flag(bool),
    Principals(Vec<Principal>),
    Count(u64),
    HeadingConfig(Option<HeadingConfig>),
    BlogPosts(Vec<BlogPost>),
    WebLinks(Vec<WebLink>),
    CaffeineInfo(Option<CaffeineInfo>),
    InfoPanelConfig(Option<InfoPanelConfig>),
    Capabilities(ServiceCapabilities),
}

/// Background refetch behavior of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub refetch_interval: Option<Duration>,
    pub refetch_on_window_focus: bool,
    pub refetch_on_mount: bool,
    pub refetch_on_reconnect: bool,
    pub stale_time: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            refetch_interval: None,
            refetch_on_window_focus: true,
            refetch_on_mount: true,
            refetch_on_reconnect: true,
            stale_time: Duration::ZERO,
        }
    }
}

impl QueryOptions {
    pub fn for_key(key: QueryKey) -> Self {
        match key {
            // An open post editor must not be clobbered by focus or timer refetches.
            QueryKey::BlogPosts => Self {
                refetch_interval: None,
                refetch_on_window_focus: false,
                refetch_on_mount: true,
                refetch_on_reconnect: true,
                stale_time: BLOG_POSTS_STALE_TIME,
            },
            QueryKey::VisitCount => Self {
                refetch_interval: Some(VISIT_COUNT_REFETCH_INTERVAL),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheEntry {
    data: Option<QueryData>,
    updated_at: Option<Instant>,
    invalidated: bool,
    generation: u64,
}

/// Issued when a fetch starts; a result is only stored if no invalidation
/// happened in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: QueryKey,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: QueryKey) -> Option<&QueryData> {
        self.entries.get(&key).and_then(|entry| entry.data.as_ref())
    }

    pub fn is_stale(&self, key: QueryKey, now: Instant) -> bool {
        let Some(entry) = self.entries.get(&key) else {
            return true;
        };
        let Some(updated_at) = entry.updated_at else {
            return true;
        };
        if entry.invalidated || entry.data.is_none() {
            return true;
        }
        now.saturating_duration_since(updated_at) >= QueryOptions::for_key(key).stale_time
    }

    pub fn is_invalidated(&self, key: QueryKey) -> bool {
        self.entries
            .get(&key)
            .map(|entry| entry.invalidated)
            .unwrap_or(false)
    }

    pub fn begin_fetch(&mut self, key: QueryKey) -> FetchTicket {
        let entry = self.entries.entry(key).or_default();
        FetchTicket {
            key,
            generation: entry.generation,
        }
    }

    /// Returns `false` when the result was superseded by a later invalidation.
    pub fn store(&mut self, ticket: FetchTicket, data: QueryData, now: Instant) -> bool {
        let entry = self.entries.entry(ticket.key).or_default();
        if ticket.generation != entry.generation {
            return false;
        }
        entry.data = Some(data);
        entry.updated_at = Some(now);
        entry.invalidated = false;
        true
    }

    /// Writes data directly, as after a confirmed local change.
    pub fn set(&mut self, key: QueryKey, data: QueryData, now: Instant) {
        let entry = self.entries.entry(key).or_default();
        entry.generation += 1;
        entry.data = Some(data);
        entry.updated_at = Some(now);
        entry.invalidated = false;
    }

    pub fn invalidate(&mut self, key: QueryKey) {
        let entry = self.entries.entry(key).or_default();
        entry.generation += 1;
        entry.invalidated = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn loaded_keys(&self) -> impl Iterator<Item = (QueryKey, &CacheEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.data.is_some())
            .map(|(key, entry)| (*key, entry))
    }

    fn sorted(mut keys: Vec<QueryKey>) -> Vec<QueryKey> {
        keys.sort();
        keys
    }

    /// Keys to refetch when the window regains focus.
    pub fn on_window_focus(&self, now: Instant) -> Vec<QueryKey> {
        Self::sorted(
            self.loaded_keys()
                .filter(|(key, _)| QueryOptions::for_key(*key).refetch_on_window_focus)
                .filter(|(key, _)| self.is_stale(*key, now))
                .map(|(key, _)| key)
                .collect(),
        )
    }

    /// Keys to refetch after the connection comes back.
    pub fn on_reconnect(&self, now: Instant) -> Vec<QueryKey> {
        Self::sorted(
            self.loaded_keys()
                .filter(|(key, _)| QueryOptions::for_key(*key).refetch_on_reconnect)
                .filter(|(key, _)| self.is_stale(*key, now))
                .map(|(key, _)| key)
                .collect(),
        )
    }

    pub fn on_mount(&self, key: QueryKey, now: Instant) -> bool {
        if self.get(key).is_none() {
            return true;
        }
        QueryOptions::for_key(key).refetch_on_mount && self.is_stale(key, now)
    }

    /// Keys whose polling interval elapsed.
    pub fn due_for_interval(&self, now: Instant) -> Vec<QueryKey> {
        Self::sorted(
            self.loaded_keys()
                .filter_map(|(key, entry)| {
                    let interval = QueryOptions::for_key(key).refetch_interval?;
                    let updated_at = entry.updated_at?;
                    (now.saturating_duration_since(updated_at) >= interval).then_some(key)
                })
                .collect(),
        )
    }

    pub fn web_links(&self) -> Option<&[WebLink]> {
        match self.get(QueryKey::WebLinks) {
            Some(QueryData::WebLinks(links)) => Some(links),
            _ => None,
        }
    }

    pub fn blog_posts(&self) -> Option<&[BlogPost]> {
        match self.get(QueryKey::BlogPosts) {
            Some(QueryData::BlogPosts(posts)) => Some(posts),
            _ => None,
        }
    }

    pub fn is_caller_admin(&self) -> Option<bool> {
        match self.get(QueryKey::IsCallerAdmin) {
            Some(QueryData::Flag(flag)) => Some(*flag),
            _ => None,
        }
    }

    pub fn admin_principals(&self) -> Option<&[Principal]> {
        match self.get(QueryKey::AdminPrincipals) {
            Some(QueryData::Principals(principals)) => Some(principals),
            _ => None,
        }
    }

    pub fn visit_count(&self) -> Option<u64> {
        match self.get(QueryKey::VisitCount) {
            Some(QueryData::Count(count)) => Some(*count),
            _ => None,
        }
    }

    pub fn caffeine_info(&self) -> Option<Option<&CaffeineInfo>> {
        match self.get(QueryKey::CaffeineInfo) {
            Some(QueryData::CaffeineInfo(info)) => Some(info.as_ref()),
            _ => None,
        }
    }

    pub fn capabilities(&self) -> Option<ServiceCapabilities> {
        match self.get(QueryKey::Capabilities) {
            Some(QueryData::Capabilities(caps)) => Some(*caps),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::WebLinkId;

    fn link(id: u64) -> WebLink {
        WebLink {
            id: WebLinkId(id),
            url: format!("https://example.com/{id}"),
            title: format!("link {id}"),
            description: String::new(),
        }
    }

    #[test]
    fn fresh_store_is_not_stale_until_invalidated() {
        let now = Instant::now();
        let mut cache = QueryCache::new();
        assert!(cache.is_stale(QueryKey::BlogPosts, now));

        let ticket = cache.begin_fetch(QueryKey::BlogPosts);
        assert!(cache.store(ticket, QueryData::BlogPosts(Vec::new()), now));
        assert!(!cache.is_stale(QueryKey::BlogPosts, now + Duration::from_secs(60)));
        assert!(cache.is_stale(QueryKey::BlogPosts, now + BLOG_POSTS_STALE_TIME));

        cache.invalidate(QueryKey::BlogPosts);
        assert!(cache.is_stale(QueryKey::BlogPosts, now));
        assert!(cache.blog_posts().is_some(), "invalidation keeps last data");
    }

    #[test]
    fn result_fetched_before_invalidation_is_dropped() {
        let now = Instant::now();
        let mut cache = QueryCache::new();
        let early = cache.begin_fetch(QueryKey::WebLinks);
        cache.invalidate(QueryKey::WebLinks);
        let late = cache.begin_fetch(QueryKey::WebLinks);

        assert!(!cache.store(early, QueryData::WebLinks(vec![link(1)]), now));
        assert!(cache.web_links().is_none());
        assert!(cache.store(late, QueryData::WebLinks(vec![link(2)]), now));
        assert_eq!(cache.web_links().expect("links")[0].id, WebLinkId(2));
    }

    #[test]
    fn blog_posts_skip_focus_refetch() {
        let now = Instant::now();
        let mut cache = QueryCache::new();
        cache.set(QueryKey::BlogPosts, QueryData::BlogPosts(Vec::new()), now);
        cache.set(QueryKey::WebLinks, QueryData::WebLinks(Vec::new()), now);
        cache.invalidate(QueryKey::BlogPosts);

        assert_eq!(cache.on_window_focus(now), vec![QueryKey::WebLinks]);
        assert_eq!(
            cache.on_reconnect(now),
            vec![QueryKey::BlogPosts, QueryKey::WebLinks]
        );
        assert!(cache.on_mount(QueryKey::BlogPosts, now));
    }

    #[test]
    fn visit_count_polls_every_thirty_seconds() {
        let now = Instant::now();
        let mut cache = QueryCache::new();
        cache.set(QueryKey::VisitCount, QueryData::Count(4), now);
        cache.set(QueryKey::WebLinks, QueryData::WebLinks(Vec::new()), now);

        assert!(cache.due_for_interval(now + Duration::from_secs(29)).is_empty());
        assert_eq!(
            cache.due_for_interval(now + VISIT_COUNT_REFETCH_INTERVAL),
            vec![QueryKey::VisitCount]
        );
    }
}
