//! DOM map of the Matrix MLS UI.
//!
//! Everything the crate knows about the remote site's structure lives here;
//! the workflow and extractor only ever see [`Locator`]s.

use crate::session::Locator;

pub(crate) const BEDS_LABEL: &str = "# Beds";
pub(crate) const BATHS_LABEL: &str = "# Baths";
pub(crate) const SQFT_LABEL: &str = "SqFt";
pub(crate) const ACRES_LABEL: &str = "Acres";
pub(crate) const YEAR_BUILT_LABEL: &str = "Year Built";

// Login

pub(crate) fn username_input() -> Locator {
    Locator::name("username")
}

pub(crate) fn password_input() -> Locator {
    Locator::name("password")
}

pub(crate) fn login_button() -> Locator {
    Locator::id("loginbtn")
}

// Subject lookup (home-page address search)

pub(crate) fn street_number_min() -> Locator {
    Locator::id("Min_Fm67_Ctrl237_TB")
}

pub(crate) fn street_number_max() -> Locator {
    Locator::id("Max_Fm67_Ctrl237_TB")
}

pub(crate) fn street_name_input() -> Locator {
    Locator::id("Fm67_Ctrl238_TextBox")
}

pub(crate) fn street_type_dropdown() -> Locator {
    Locator::id("dropdown_Fm67_Ctrl239_LB")
}

pub(crate) fn street_type_option(street_type: &str) -> Locator {
    Locator::css(format!(
        "input[type='checkbox'][data-mtrx-item-text='{street_type}']"
    ))
}

pub(crate) fn street_type_apply() -> Locator {
    Locator::css("input[value='Apply']")
}

pub(crate) fn zip_input() -> Locator {
    Locator::id("Fm67_Ctrl60_TextBox")
}

pub(crate) fn home_search_button() -> Locator {
    Locator::css("button[data-mtx-track='Homepage - Search - Search Click']")
}

pub(crate) fn subject_record_link() -> Locator {
    Locator::css("a[href*='/Matrix/Display/GetDisplay']")
}

/// Labeled value cell on the subject detail record.
pub(crate) fn detail_field(label: &str) -> Locator {
    Locator::xpath(format!(
        "//div[normalize-space()='{label}' and contains(@class,'border-bottom')]/following-sibling::div[contains(@class,'fw-bold')][1]"
    ))
}

// Comparable search form

pub(crate) fn active_status_checkbox() -> Locator {
    Locator::xpath("//label[contains(.,'Active')]/preceding-sibling::input[@type='checkbox']")
}

pub(crate) fn closed_status_checkbox() -> Locator {
    Locator::xpath("//label[contains(.,'Closed')]/preceding-sibling::input[@type='checkbox']")
}

pub(crate) fn closed_days_input() -> Locator {
    Locator::xpath("//label[normalize-space()='Closed']/following::input[@class='textbox'][1]")
}

pub(crate) fn map_distance_input() -> Locator {
    Locator::class_name("mapSearchDistance")
}

pub(crate) fn map_address_input() -> Locator {
    Locator::id("Fm23_Ctrl19_TB")
}

pub(crate) fn beds_range_input() -> Locator {
    Locator::id("Fm23_Ctrl55_TB")
}

pub(crate) fn baths_range_input() -> Locator {
    Locator::id("Fm23_Ctrl56_TB")
}

pub(crate) fn sqft_range_input() -> Locator {
    Locator::id("Fm23_Ctrl59_TB")
}

pub(crate) fn acres_range_input() -> Locator {
    Locator::id("Fm23_Ctrl125_TB")
}

pub(crate) fn year_range_input() -> Locator {
    Locator::id("Fm23_Ctrl124_TB")
}

pub(crate) fn run_search_button() -> Locator {
    Locator::id("m_ucSearchButtons_m_lbSearch")
}

// Result display

pub(crate) fn first_result_link() -> Locator {
    Locator::css("a[data-mtx-track='Results - In-Display Full Link Click']")
}

pub(crate) fn listing_tab() -> Locator {
    Locator::link_text("Listing")
}

pub(crate) fn photos_tab() -> Locator {
    Locator::link_text("Photos")
}

pub(crate) fn list_price_field() -> Locator {
    Locator::xpath(
        "//td[span[@class='label' and normalize-space(text())='List Price:']]/following-sibling::td[1]//span[@class='field']",
    )
}

pub(crate) fn photo_images() -> Locator {
    Locator::css("img.IV_Image.img-responsive")
}

pub(crate) fn next_listing_control() -> Locator {
    Locator::id("m_DisplayCore_dpy2")
}
