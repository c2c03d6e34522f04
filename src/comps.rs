//! Comparable-search workflow.
//!
//! An explicit phase machine over one remote session: authenticate, locate
//! the subject record, extract its attributes, derive criteria, submit the
//! comparable search, then walk the result listings up to a hard cap. Only
//! the critical path (authentication, subject lookup, search submission) can
//! fail the run; everything per-listing degrades to absent data.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::address::StreetAddress;
use crate::config::{Config, SearchTolerances};
use crate::criteria::SearchCriteria;
use crate::error::ArvError;
use crate::matrix;
use crate::session::{ElementState, SessionDriver, SessionError};
use crate::subject::{extract_subject, SubjectProperty};

/// Hard upper bound on listings walked per run, regardless of how many
/// results the search returns.
pub const MAX_COMPARABLES: usize = 10;

const WAIT: Duration = Duration::from_secs(15);
const RESULTS_WAIT: Duration = Duration::from_secs(20);
const NEXT_WAIT: Duration = Duration::from_secs(10);
const PRICE_WAIT: Duration = Duration::from_secs(5);

/// One result listing. Price and photos are independently optional; a gap in
/// either is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparableListing {
    pub ordinal: usize,
    pub price: Option<String>,
    pub photo_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    pub subject: SubjectProperty,
    pub criteria: SearchCriteria,
    pub comparables: Vec<ComparableListing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Authenticate,
    LocateSubject,
    ExtractSubject,
    BuildCriteria,
    SubmitSearch,
    Comparable(usize),
    Done,
}

pub struct SearchWorkflow<'a> {
    session: &'a dyn SessionDriver,
    config: &'a Config,
    tolerances: SearchTolerances,
    address: StreetAddress,
    raw_address: String,
    zip: String,
}

fn fatal(step: &'static str) -> impl Fn(SessionError) -> ArvError {
    move |source| {
        if source.is_timeout() {
            ArvError::CriticalTimeout { step, source }
        } else {
            ArvError::Session { step, source }
        }
    }
}

impl<'a> SearchWorkflow<'a> {
    pub fn new(
        session: &'a dyn SessionDriver,
        config: &'a Config,
        tolerances: SearchTolerances,
        raw_address: &str,
        zip: Option<&str>,
    ) -> Result<Self, ArvError> {
        let address = StreetAddress::parse(raw_address)?;
        Ok(Self {
            session,
            config,
            tolerances,
            address,
            raw_address: raw_address.to_string(),
            zip: zip.unwrap_or_default().to_string(),
        })
    }

    pub async fn run(self) -> Result<WorkflowOutput, ArvError> {
        let mut phase = Phase::Authenticate;
        let mut subject = SubjectProperty::default();
        let mut criteria: Option<SearchCriteria> = None;
        let mut comparables: Vec<ComparableListing> = Vec::new();

        loop {
            debug!(?phase, "workflow phase");
            phase = match phase {
                Phase::Authenticate => {
                    self.authenticate().await.map_err(fatal("authentication"))?;
                    Phase::LocateSubject
                }
                Phase::LocateSubject => {
                    self.locate_subject()
                        .await
                        .map_err(fatal("subject lookup"))?;
                    Phase::ExtractSubject
                }
                Phase::ExtractSubject => {
                    subject = extract_subject(self.session).await;
                    info!(?subject, "extracted subject property");
                    Phase::BuildCriteria
                }
                Phase::BuildCriteria => {
                    criteria = Some(SearchCriteria::build(&subject, &self.tolerances));
                    Phase::SubmitSearch
                }
                Phase::SubmitSearch => {
                    let built = *criteria
                        .get_or_insert_with(|| SearchCriteria::build(&subject, &self.tolerances));
                    self.submit_search(&built)
                        .await
                        .map_err(fatal("search submission"))?;
                    Phase::Comparable(1)
                }
                Phase::Comparable(n) => {
                    comparables.push(self.capture_listing(n).await);
                    if n >= MAX_COMPARABLES {
                        info!(cap = MAX_COMPARABLES, "comparable cap reached");
                        Phase::Done
                    } else if self.advance_listing().await {
                        Phase::Comparable(n + 1)
                    } else {
                        Phase::Done
                    }
                }
                Phase::Done => break,
            };
        }

        let criteria =
            criteria.unwrap_or_else(|| SearchCriteria::build(&subject, &self.tolerances));
        info!(comparables = comparables.len(), "comparable search complete");
        Ok(WorkflowOutput {
            subject,
            criteria,
            comparables,
        })
    }

    async fn authenticate(&self) -> Result<(), SessionError> {
        self.session.navigate(&self.config.login_url).await?;
        let username = self
            .session
            .wait_for(&matrix::username_input(), ElementState::Present, WAIT)
            .await?;
        self.session.send_keys(&username, &self.config.username).await?;
        let password = self.session.find(&matrix::password_input()).await?;
        self.session.send_keys(&password, &self.config.password).await?;
        let login = self.session.find(&matrix::login_button()).await?;
        self.session.click(&login).await?;
        self.session
            .wait_for_url_change(&self.config.login_url, WAIT)
            .await
    }

    async fn locate_subject(&self) -> Result<(), SessionError> {
        self.session.navigate(&self.config.home_url).await?;
        self.settle().await;

        let number_min = self
            .session
            .wait_for(&matrix::street_number_min(), ElementState::Present, WAIT)
            .await?;
        self.session.send_keys(&number_min, &self.address.number).await?;
        let number_max = self.session.find(&matrix::street_number_max()).await?;
        self.session.send_keys(&number_max, &self.address.number).await?;
        let name = self.session.find(&matrix::street_name_input()).await?;
        self.session.send_keys(&name, &self.address.name).await?;

        let dropdown = self.session.find(&matrix::street_type_dropdown()).await?;
        self.session.click(&dropdown).await?;
        let option = self
            .session
            .wait_for(
                &matrix::street_type_option(&self.address.street_type),
                ElementState::Clickable,
                WAIT,
            )
            .await?;
        self.session.click(&option).await?;
        let apply = self.session.find(&matrix::street_type_apply()).await?;
        self.session.click(&apply).await?;

        let zip = self.session.find(&matrix::zip_input()).await?;
        self.session.send_keys(&zip, &self.zip).await?;

        let search = self
            .session
            .wait_for(&matrix::home_search_button(), ElementState::Clickable, WAIT)
            .await?;
        self.session.click(&search).await?;

        // the run cannot proceed without the subject's detail record
        let record = self
            .session
            .wait_for(&matrix::subject_record_link(), ElementState::Clickable, WAIT)
            .await?;
        self.session.click(&record).await
    }

    async fn submit_search(&self, criteria: &SearchCriteria) -> Result<(), SessionError> {
        self.session.navigate(&self.config.search_url).await?;
        self.settle().await;

        let active = self
            .session
            .wait_for(&matrix::active_status_checkbox(), ElementState::Clickable, WAIT)
            .await?;
        if !self.session.is_selected(&active).await? {
            self.session.click(&active).await?;
        }
        let closed = self
            .session
            .wait_for(&matrix::closed_status_checkbox(), ElementState::Clickable, WAIT)
            .await?;
        if !self.session.is_selected(&closed).await? {
            self.session.click(&closed).await?;
        }

        let closed_days = self.session.find(&matrix::closed_days_input()).await?;
        self.session.clear(&closed_days).await?;
        self.session.send_keys(&closed_days, "0-360").await?;

        let distance = self.session.find(&matrix::map_distance_input()).await?;
        self.session.send_keys(&distance, "1").await?;
        let address = self.session.find(&matrix::map_address_input()).await?;
        self.session.send_keys(&address, &self.raw_address).await?;
        self.settle().await;

        let beds = self.session.find(&matrix::beds_range_input()).await?;
        self.session.send_keys(&beds, &criteria.beds_range()).await?;
        let baths = self.session.find(&matrix::baths_range_input()).await?;
        self.session.send_keys(&baths, &criteria.baths_range()).await?;
        let sqft = self.session.find(&matrix::sqft_range_input()).await?;
        self.session.send_keys(&sqft, &criteria.sqft_range()).await?;
        let acres = self.session.find(&matrix::acres_range_input()).await?;
        self.session.send_keys(&acres, &criteria.acres_range()).await?;
        let year = self.session.find(&matrix::year_range_input()).await?;
        self.session.send_keys(&year, &criteria.year_range()).await?;

        let results = self
            .session
            .wait_for(&matrix::run_search_button(), ElementState::Clickable, RESULTS_WAIT)
            .await?;
        // the page overlays this control, a direct click is intercepted
        self.session.run_script("this.click();", Some(&results)).await?;
        self.settle().await;

        // a results page must appear within the bound or the run is dead
        let first = self
            .session
            .wait_for(&matrix::first_result_link(), ElementState::Clickable, WAIT)
            .await?;
        self.session.click(&first).await
    }

    async fn capture_listing(&self, ordinal: usize) -> ComparableListing {
        let price = self.read_price().await;
        let photo_urls = self.collect_photo_urls().await;
        info!(
            listing = ordinal,
            price = price.as_deref().unwrap_or("N/A"),
            photos = photo_urls.len(),
            "captured comparable"
        );
        ComparableListing {
            ordinal,
            price,
            photo_urls,
        }
    }

    async fn read_price(&self) -> Option<String> {
        // the price lives on the Listing tab; switching is itself best-effort
        if let Ok(tab) = self.session.find(&matrix::listing_tab()).await {
            let _ = self.session.click(&tab).await;
        }
        let field = match self
            .session
            .wait_for(&matrix::list_price_field(), ElementState::Visible, PRICE_WAIT)
            .await
        {
            Ok(field) => field,
            Err(e) => {
                warn!(error = %e, "list price unavailable for this comparable");
                return None;
            }
        };
        match self.session.text(&field).await {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to read list price");
                None
            }
        }
    }

    async fn collect_photo_urls(&self) -> Vec<String> {
        if let Ok(tab) = self
            .session
            .wait_for(&matrix::photos_tab(), ElementState::Clickable, WAIT)
            .await
        {
            let _ = self.session.click(&tab).await;
        }

        let urls = match self
            .session
            .wait_for(&matrix::photo_images(), ElementState::Present, WAIT)
            .await
        {
            Ok(_) => match self.session.find_all(&matrix::photo_images()).await {
                Ok(images) => {
                    let mut urls = Vec::with_capacity(images.len());
                    for image in &images {
                        if let Ok(Some(src)) = self.session.attr(image, "src").await {
                            urls.push(src);
                        }
                    }
                    urls
                }
                Err(e) => {
                    warn!(error = %e, "failed to enumerate photos");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "no photos for this comparable");
                Vec::new()
            }
        };

        // back to the listing view for the price/next controls
        if let Ok(tab) = self
            .session
            .wait_for(&matrix::listing_tab(), ElementState::Clickable, WAIT)
            .await
        {
            let _ = self.session.click(&tab).await;
        }
        urls
    }

    /// Moves to the next listing. A missing or unresponsive next control ends
    /// the iteration normally.
    async fn advance_listing(&self) -> bool {
        match self
            .session
            .wait_for(&matrix::next_listing_control(), ElementState::Clickable, NEXT_WAIT)
            .await
        {
            Ok(control) => {
                if let Err(e) = self.session.run_script("this.click();", Some(&control)).await {
                    debug!(error = %e, "next control rejected the click, stopping iteration");
                    return false;
                }
                self.settle().await;
                true
            }
            Err(_) => {
                debug!("no next control, comparable iteration finished");
                false
            }
        }
    }

    async fn settle(&self) {
        sleep(Duration::from_millis(self.config.settle_ms)).await;
    }
}
