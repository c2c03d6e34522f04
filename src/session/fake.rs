//! Deterministic in-memory session for exercising the workflow without a
//! browser.
//!
//! A test scripts the fake with subject fields, a sequence of comparable
//! listings, and optionally a point at which waits should time out; the fake
//! then answers the workflow's lookups against that script and records what
//! was typed, clicked, and navigated for later assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    ElementHandle, ElementState, Locator, SessionDriver, SessionError, SessionResult,
};
use crate::matrix;

#[derive(Debug, Clone, Default)]
pub struct FakeListing {
    pub price: Option<String>,
    pub photos: Vec<String>,
}

/// Step at which the fake simulates a fatal timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Login,
    SubjectRecord,
    SearchResults,
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Element(Locator),
    Photo(String),
}

#[derive(Default)]
struct Inner {
    current: usize,
    handles: HashMap<u64, Target>,
    typed: Vec<(Locator, String)>,
    clicked: Vec<Locator>,
    navigated: Vec<String>,
    close_calls: usize,
}

pub struct FakeSession {
    subject: HashMap<String, String>,
    listings: Vec<FakeListing>,
    fail_point: Option<FailPoint>,
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            subject: HashMap::new(),
            listings: Vec::new(),
            fail_point: None,
            next_id: AtomicU64::new(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_subject(mut self, fields: &[(&str, &str)]) -> Self {
        self.subject = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn with_listings(mut self, listings: Vec<FakeListing>) -> Self {
        self.listings = listings;
        self
    }

    pub fn with_fail_point(mut self, fail_point: FailPoint) -> Self {
        self.fail_point = Some(fail_point);
        self
    }

    pub fn close_calls(&self) -> usize {
        self.inner.lock().unwrap().close_calls
    }

    /// Values typed into the element matched by `locator`, in order.
    pub fn typed_into(&self, locator: &Locator) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .typed
            .iter()
            .filter(|(l, _)| l == locator)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn visited(&self) -> Vec<String> {
        self.inner.lock().unwrap().navigated.clone()
    }

    fn insert(&self, target: Target) -> ElementHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().unwrap().handles.insert(id, target);
        ElementHandle::new(id)
    }

    fn target(&self, element: &ElementHandle) -> SessionResult<Target> {
        self.inner
            .lock()
            .unwrap()
            .handles
            .get(&element.id)
            .cloned()
            .ok_or(SessionError::Stale(element.id))
    }

    fn timeout(locator: &Locator) -> SessionError {
        SessionError::Timeout {
            what: locator.to_string(),
            timeout: Duration::from_secs(0),
        }
    }

    fn subject_label(locator: &Locator) -> Option<String> {
        for label in [
            matrix::BEDS_LABEL,
            matrix::BATHS_LABEL,
            matrix::SQFT_LABEL,
            matrix::ACRES_LABEL,
            matrix::YEAR_BUILT_LABEL,
        ] {
            if locator == &matrix::detail_field(label) {
                return Some(label.to_string());
            }
        }
        None
    }

    fn current_listing(&self) -> Option<FakeListing> {
        let current = self.inner.lock().unwrap().current;
        self.listings.get(current).cloned()
    }

    /// Whether the locator should resolve right now, per the script.
    fn available(&self, locator: &Locator) -> bool {
        match self.fail_point {
            Some(FailPoint::Login) if locator == &matrix::username_input() => return false,
            Some(FailPoint::SubjectRecord) if locator == &matrix::subject_record_link() => {
                return false
            }
            Some(FailPoint::SearchResults) if locator == &matrix::first_result_link() => {
                return false
            }
            _ => {}
        }
        if locator == &matrix::list_price_field() {
            return self
                .current_listing()
                .map(|l| l.price.is_some())
                .unwrap_or(false);
        }
        if locator == &matrix::photo_images() {
            return self
                .current_listing()
                .map(|l| !l.photos.is_empty())
                .unwrap_or(false);
        }
        if locator == &matrix::next_listing_control() {
            let current = self.inner.lock().unwrap().current;
            return current + 1 < self.listings.len();
        }
        if let Some(label) = Self::subject_label(locator) {
            return self.subject.contains_key(&label);
        }
        true
    }
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionDriver for FakeSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        self.inner.lock().unwrap().navigated.push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .navigated
            .last()
            .cloned()
            .unwrap_or_default())
    }

    async fn find(&self, locator: &Locator) -> SessionResult<ElementHandle> {
        if !self.available(locator) {
            return Err(SessionError::NotFound(locator.to_string()));
        }
        Ok(self.insert(Target::Element(locator.clone())))
    }

    async fn find_all(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        if locator == &matrix::photo_images() {
            let photos = self.current_listing().map(|l| l.photos).unwrap_or_default();
            return Ok(photos
                .into_iter()
                .map(|url| self.insert(Target::Photo(url)))
                .collect());
        }
        Ok(vec![self.insert(Target::Element(locator.clone()))])
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        _state: ElementState,
        _timeout: Duration,
    ) -> SessionResult<ElementHandle> {
        if !self.available(locator) {
            return Err(Self::timeout(locator));
        }
        Ok(self.insert(Target::Element(locator.clone())))
    }

    async fn wait_for_url_change(&self, _from: &str, _timeout: Duration) -> SessionResult<()> {
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> SessionResult<()> {
        if let Target::Element(locator) = self.target(element)? {
            self.inner.lock().unwrap().clicked.push(locator);
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        if let Target::Element(locator) = self.target(element)? {
            self.inner
                .lock()
                .unwrap()
                .typed
                .push((locator, text.to_string()));
        }
        Ok(())
    }

    async fn clear(&self, _element: &ElementHandle) -> SessionResult<()> {
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> SessionResult<String> {
        match self.target(element)? {
            Target::Element(locator) => {
                if let Some(label) = Self::subject_label(&locator) {
                    return Ok(self.subject.get(&label).cloned().unwrap_or_default());
                }
                if locator == matrix::list_price_field() {
                    return Ok(self
                        .current_listing()
                        .and_then(|l| l.price)
                        .unwrap_or_default());
                }
                Ok(String::new())
            }
            Target::Photo(_) => Ok(String::new()),
        }
    }

    async fn attr(&self, element: &ElementHandle, name: &str) -> SessionResult<Option<String>> {
        match self.target(element)? {
            Target::Photo(url) if name == "src" => Ok(Some(url)),
            _ => Ok(None),
        }
    }

    async fn is_selected(&self, _element: &ElementHandle) -> SessionResult<bool> {
        Ok(false)
    }

    async fn run_script(
        &self,
        _body: &str,
        element: Option<&ElementHandle>,
    ) -> SessionResult<Value> {
        if let Some(element) = element {
            if let Target::Element(locator) = self.target(element)? {
                let mut inner = self.inner.lock().unwrap();
                if locator == matrix::next_listing_control() {
                    inner.current += 1;
                }
                inner.clicked.push(locator);
            }
        }
        Ok(Value::Null)
    }

    async fn close(&self) -> SessionResult<()> {
        self.inner.lock().unwrap().close_calls += 1;
        Ok(())
    }
}
