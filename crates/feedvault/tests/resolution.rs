//! Resolution scenarios driven through scripted pages.
//!
//! Each scripted page answers a navigation with a fixed burst of outgoing
//! requests, a resulting location and a video flag, the way the live site
//! would after rendering a post.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::mpsc;

use feedvault::probe::{LOCATION_SCRIPT, VIDEO_PROBE_SCRIPT};
use feedvault::*;

// ─────────────────────── helpers ───────────────────────

const CDN: &str = "https://scontent.cdninstagram.com";

fn image(name: &str) -> String {
    format!("{CDN}/v/t51.2885-15/{name}_n.jpg?stp=dst-jpg_e35")
}

fn thumb(name: &str) -> String {
    format!("{CDN}/v/t51.2885-19/s150x150/{name}_n.jpg")
}

fn video(segment: &str, asset: u64, tag: &str) -> String {
    let efg = STANDARD.encode(format!(
        r#"{{"vencode_tag":"{tag}","xpv_asset_id":{asset}}}"#
    ));
    let mut url = url::Url::parse(&format!("{CDN}/o1/v/t16/f2/m86/{segment}.mp4")).unwrap();
    url.query_pairs_mut()
        .append_pair("efg", &efg)
        .append_pair("bytestart", "0")
        .append_pair("byteend", "2048");
    url.to_string()
}

/// What the page does when navigated to one URL.
#[derive(Clone, Default)]
struct Visit {
    requests: Vec<String>,
    /// Location after the navigation; the navigated URL when `None`.
    lands_on: Option<String>,
    video: bool,
    fail: bool,
}

impl Visit {
    fn requests(requests: Vec<String>) -> Self {
        Self {
            requests,
            ..Default::default()
        }
    }

    fn lands_on(mut self, href: &str) -> Self {
        self.lands_on = Some(href.to_string());
        self
    }

    fn with_video(mut self) -> Self {
        self.video = true;
        self
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct PageState {
    visits: HashMap<String, VecDeque<Visit>>,
    subscribers: Vec<mpsc::UnboundedSender<String>>,
    href: String,
    video: bool,
    navigations: Vec<String>,
    closed: bool,
}

#[derive(Clone, Default)]
struct ScriptedPage {
    state: Arc<Mutex<PageState>>,
}

impl ScriptedPage {
    /// Queue a visit for a URL. Repeated visits replay queued entries in
    /// order and then keep replaying the last one.
    fn on(self, url: &str, visit: Visit) -> Self {
        self.state
            .lock()
            .unwrap()
            .visits
            .entry(url.to_string())
            .or_default()
            .push_back(visit);
        self
    }

    fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    fn live_subscribers(&self) -> usize {
        let mut st = self.state.lock().unwrap();
        st.subscribers.retain(|tx| !tx.is_closed());
        st.subscribers.len()
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn navigate(
        &mut self,
        url: &str,
        _wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), CapabilityError> {
        let mut st = self.state.lock().unwrap();
        st.navigations.push(url.to_string());
        let visit = match st.visits.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => Visit::default(),
        };
        if visit.fail {
            return Err(CapabilityError::NavigationTimeout(timeout.as_millis() as u64));
        }
        st.href = visit.lands_on.clone().unwrap_or_else(|| url.to_string());
        st.video = visit.video;
        st.subscribers.retain(|tx| !tx.is_closed());
        for req in &visit.requests {
            for tx in &st.subscribers {
                let _ = tx.send(req.clone());
            }
        }
        Ok(())
    }

    async fn subscribe_requests(&self) -> Result<RequestStream, CapabilityError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().subscribers.push(tx);
        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|u| (u, rx))
        })))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, CapabilityError> {
        let st = self.state.lock().unwrap();
        match script {
            LOCATION_SCRIPT => Ok(serde_json::Value::String(st.href.clone())),
            VIDEO_PROBE_SCRIPT => Ok(serde_json::Value::Bool(st.video)),
            other => Err(CapabilityError::Evaluate(format!("unscripted: {other}"))),
        }
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>, CapabilityError> {
        Ok(Vec::new())
    }

    async fn close(self: Box<Self>) -> Result<(), CapabilityError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

struct ScriptedBrowser {
    page: Option<ScriptedPage>,
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>, CapabilityError> {
        match &self.page {
            Some(page) => Ok(Box::new(page.clone())),
            None => Err(CapabilityError::Unavailable("no browser".into())),
        }
    }

    async fn shutdown(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<StoredMedia>>,
    calls: Mutex<usize>,
}

impl MediaStore for MemoryStore {
    fn replace_all(&self, media: &[ResolvedMedia]) -> HarvestResult<usize> {
        *self.calls.lock().unwrap() += 1;
        let mut rows = self.rows.lock().unwrap();
        rows.clear();
        for (i, m) in media.iter().enumerate() {
            rows.push(StoredMedia {
                id: i as i64 + 1,
                seq: i as i64,
                media: m.clone(),
                created_at: None,
            });
        }
        Ok(rows.len())
    }

    fn list(&self) -> HarvestResult<Vec<StoredMedia>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    fn get(&self, id: i64) -> HarvestResult<Option<StoredMedia>> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }
}

fn site(path: &str) -> String {
    format!("https://www.instagram.com{path}")
}

fn assert_no_duplicates(media: &[ResolvedMedia]) {
    let mut sigs = HashSet::new();
    let mut assets = HashSet::new();
    for m in media {
        let req = classify(&m.link, PostKind::Carousel, &DedupRegistry::new()).unwrap();
        assert!(sigs.insert(req.signature.clone()), "duplicate {}", req.signature);
        if let Some(id) = req.asset_id {
            assert!(assets.insert(id.clone()), "duplicate asset {id}");
        }
    }
}

// ─────────────────────── scenarios ───────────────────────

#[tokio::test(start_paused = true)]
async fn image_post_then_carousel_end_to_end() {
    let page = ScriptedPage::default()
        .on(
            &site("/p/1/"),
            Visit::requests(vec![
                format!("{CDN}/static/bundle.js"),
                thumb("owner"),
                image("first"),
                image("grid_preload"),
            ]),
        )
        .on(&site("/p/2/?img_index=1"), Visit::requests(vec![image("slide1")]))
        .on(&site("/p/2/?img_index=2"), Visit::requests(vec![]));

    let browser = ScriptedBrowser {
        page: Some(page.clone()),
    };
    let store = MemoryStore::default();
    let posts = vec![
        Post::new("/p/1/", PostKind::Image),
        Post::new("/p/2/", PostKind::Carousel),
    ];

    let report = Orchestrator::new(ResolverConfig::default())
        .run(&browser, &posts, &store)
        .await
        .unwrap();

    assert_eq!(report.resolved, 2);
    assert_eq!(report.persisted, 2);
    let stored: Vec<ResolvedMedia> = store.list().unwrap().into_iter().map(|s| s.media).collect();
    assert_eq!(
        stored,
        vec![
            ResolvedMedia {
                link: image("first"),
                kind: PostKind::Image,
                img_index: None,
                post_url: site("/p/1/"),
            },
            ResolvedMedia {
                link: image("slide1"),
                kind: PostKind::Carousel,
                img_index: Some(1),
                post_url: site("/p/2/"),
            },
        ]
    );
    assert!(page.state.lock().unwrap().closed);
    assert_eq!(page.live_subscribers(), 0);
}

#[tokio::test(start_paused = true)]
async fn carousel_stops_after_two_consecutive_redirects() {
    let page = ScriptedPage::default()
        .on(&site("/p/c/?img_index=1"), Visit::requests(vec![image("only")]))
        .on(
            &site("/p/c/?img_index=2"),
            Visit::requests(vec![image("only")]).lands_on(&site("/p/c/?img_index=1")),
        );
    let mut p = page.clone();
    let mut registry = DedupRegistry::new();

    let walk = walk_carousel(
        &mut p,
        &Post::new("/p/c/", PostKind::Carousel),
        &ResolverConfig::default(),
        &mut registry,
    )
    .await;

    assert_eq!(walk.end, WalkEnd::RedirectLimit { index: 2 });
    assert_eq!(walk.steps, 3);
    assert_eq!(walk.media.len(), 1, "redirected steps emit nothing");
    assert_eq!(walk.media[0].img_index, Some(1));
    assert_eq!(
        page.navigations(),
        vec![
            site("/p/c/?img_index=1"),
            site("/p/c/?img_index=2"),
            site("/p/c/?img_index=2"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn single_redirect_is_retried_without_advancing() {
    let page = ScriptedPage::default()
        .on(&site("/p/c/?img_index=1"), Visit::requests(vec![image("one")]))
        .on(
            &site("/p/c/?img_index=2"),
            Visit::requests(vec![image("one")]).lands_on(&site("/p/c/")),
        )
        .on(&site("/p/c/?img_index=2"), Visit::requests(vec![image("two")]))
        .on(&site("/p/c/?img_index=3"), Visit::requests(vec![thumb("owner")]));
    let mut p = page.clone();
    let mut registry = DedupRegistry::new();

    let walk = walk_carousel(
        &mut p,
        &Post::new("/p/c/", PostKind::Carousel),
        &ResolverConfig::default(),
        &mut registry,
    )
    .await;

    assert_eq!(walk.end, WalkEnd::Exhausted { index: 3 });
    let indices: Vec<_> = walk.media.iter().map(|m| m.img_index).collect();
    assert_eq!(indices, vec![Some(1), Some(2)]);
    assert_eq!(walk.media[1].link, image("two"));
}

#[tokio::test(start_paused = true)]
async fn successful_step_resets_the_redirect_count() {
    let bounced = site("/p/r/?img_index=1");
    let page = ScriptedPage::default()
        .on(&site("/p/r/?img_index=1"), Visit::requests(vec![image("r1")]))
        .on(
            &site("/p/r/?img_index=2"),
            Visit::requests(vec![image("r1")]).lands_on(&bounced),
        )
        .on(&site("/p/r/?img_index=2"), Visit::requests(vec![image("r2")]))
        .on(
            &site("/p/r/?img_index=3"),
            Visit::requests(vec![image("r1")]).lands_on(&bounced),
        )
        .on(&site("/p/r/?img_index=3"), Visit::requests(vec![image("r3")]))
        .on(&site("/p/r/?img_index=4"), Visit::requests(vec![]));
    let mut p = page.clone();
    let mut registry = DedupRegistry::new();

    let walk = walk_carousel(
        &mut p,
        &Post::new("/p/r/", PostKind::Carousel),
        &ResolverConfig::default(),
        &mut registry,
    )
    .await;

    // Two redirects in total, never two in a row.
    assert_eq!(walk.end, WalkEnd::Exhausted { index: 4 });
    let links: Vec<_> = walk.media.iter().map(|m| m.link.clone()).collect();
    assert_eq!(links, vec![image("r1"), image("r2"), image("r3")]);
    let indices: Vec<_> = walk.media.iter().map(|m| m.img_index).collect();
    assert_eq!(indices, vec![Some(1), Some(2), Some(3)]);
    assert_eq!(walk.steps, 6);
}

#[tokio::test(start_paused = true)]
async fn dom_video_probe_breaks_image_video_ties() {
    let page = ScriptedPage::default()
        .on(
            &site("/p/v/?img_index=1"),
            Visit::requests(vec![image("poster"), video("seg_a", 501, "h264_high")]).with_video(),
        )
        .on(
            &site("/p/v/?img_index=2"),
            Visit::requests(vec![video("seg_b", 501, "h264_high"), image("still")]),
        )
        .on(&site("/p/v/?img_index=3"), Visit::requests(vec![]));
    let mut p = page.clone();
    let mut registry = DedupRegistry::new();

    let walk = walk_carousel(
        &mut p,
        &Post::new("/p/v/", PostKind::Carousel),
        &ResolverConfig::default(),
        &mut registry,
    )
    .await;

    assert_eq!(walk.media.len(), 2);
    assert_eq!(walk.media[0].link, video("seg_a", 501, "h264_high"));
    assert_eq!(walk.media[1].link, image("still"));
    assert!(registry.has("501"));
}

#[tokio::test(start_paused = true)]
async fn navigation_failure_keeps_earlier_items_and_moves_on() {
    let page = ScriptedPage::default()
        .on(&site("/p/a/?img_index=1"), Visit::requests(vec![image("a1")]))
        .on(&site("/p/a/?img_index=2"), Visit::failing())
        .on(&site("/p/b/"), Visit::failing())
        .on(
            &site("/reel/r/"),
            Visit::requests(vec![
                video("r0", 900, "baseline_0"),
                video("r1", 901, "h264_high"),
                video("r2", 902, "h264_high"),
            ]),
        );
    let mut p = page.clone();
    let posts = vec![
        Post::new("/p/a/", PostKind::Carousel),
        Post::new("/p/b/", PostKind::Image),
        Post::new("/reel/r/", PostKind::Reel),
    ];

    let mut orchestrator = Orchestrator::new(ResolverConfig::default());
    let media = orchestrator.resolve_all(&mut p, &posts).await;

    assert_eq!(media.len(), 2);
    assert_eq!(media[0].img_index, Some(1));
    assert_eq!(media[1].kind, PostKind::Reel);
    assert_eq!(media[1].link, video("r1", 901, "h264_high"));
    assert_eq!(page.live_subscribers(), 0);
}

#[tokio::test(start_paused = true)]
async fn assets_are_never_selected_twice_in_a_session() {
    let shared = video("shared_seg1", 7001, "h264_high");
    let shared_again = video("shared_seg2", 7001, "h264_high");
    let page = ScriptedPage::default()
        .on(&site("/p/1/"), Visit::requests(vec![image("cover")]))
        // Same image shows up again on the next post before its own.
        .on(&site("/p/2/"), Visit::requests(vec![image("cover"), image("second")]))
        .on(&site("/reel/3/"), Visit::requests(vec![shared.clone()]))
        .on(
            &site("/p/4/?img_index=1"),
            Visit::requests(vec![shared_again, image("second")]).with_video(),
        )
        .on(&site("/p/5/"), Visit::requests(vec![image("cover")]));
    let mut p = page.clone();
    let posts = vec![
        Post::new("/p/1/", PostKind::Image),
        Post::new("/p/2/", PostKind::Image),
        Post::new("/reel/3/", PostKind::Reel),
        Post::new("/p/4/", PostKind::Carousel),
        Post::new("/p/5/", PostKind::Image),
    ];

    let mut orchestrator = Orchestrator::new(ResolverConfig::default());
    let media = orchestrator.resolve_all(&mut p, &posts).await;

    let links: Vec<_> = media.iter().map(|m| m.link.clone()).collect();
    assert_eq!(links, vec![image("cover"), image("second"), shared]);
    assert_no_duplicates(&media);
}

#[tokio::test(start_paused = true)]
async fn repeated_sessions_do_not_share_dedup_state() {
    let page = ScriptedPage::default().on(&site("/p/1/"), Visit::requests(vec![image("cover")]));
    let posts = vec![Post::new("/p/1/", PostKind::Image)];

    for _ in 0..2 {
        let mut p = page.clone();
        let media = Orchestrator::new(ResolverConfig::default())
            .resolve_all(&mut p, &posts)
            .await;
        assert_eq!(media.len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn unusable_browser_persists_nothing() {
    let browser = ScriptedBrowser { page: None };
    let store = MemoryStore::default();
    let posts = vec![Post::new("/p/1/", PostKind::Image)];

    let result = Orchestrator::new(ResolverConfig::default())
        .run(&browser, &posts, &store)
        .await;

    assert!(matches!(result, Err(HarvestError::Capability(_))));
    assert_eq!(*store.calls.lock().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_result_leaves_store_untouched() {
    let browser = ScriptedBrowser {
        page: Some(ScriptedPage::default()),
    };
    let store = MemoryStore::default();
    store
        .replace_all(&[ResolvedMedia {
            link: image("old"),
            kind: PostKind::Image,
            img_index: None,
            post_url: site("/p/old/"),
        }])
        .unwrap();

    let report = Orchestrator::new(ResolverConfig::default())
        .run(&browser, &[Post::new("/p/none/", PostKind::Image)], &store)
        .await
        .unwrap();

    assert_eq!(report.resolved, 0);
    assert_eq!(report.empty_posts, 1);
    assert_eq!(report.persisted, 0);
    assert_eq!(*store.calls.lock().unwrap(), 1);
    assert_eq!(store.list().unwrap().len(), 1);
}
