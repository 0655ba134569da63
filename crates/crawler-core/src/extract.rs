//! Extraction of the Boostable Bosses library page.
//!
//! The page is not parsed into a tree. The region between the main content
//! and the footer is split into lines, and two lines matter:
//!
//! - the line announcing today's boosted boss, whose `title` attribute holds
//!   the name and whose header image holds the picture
//! - the caption container line, which lists every boss as an image followed
//!   by a `<div>` with its name
//!
//! Every marker is required. A page missing one fails with
//! [`Error::Structure`] instead of yielding a truncated list.

use crate::scanner::Scanner;
use crate::types::{AMOUNT_OF_BOOSTABLE_BOSSES, BoostableBoss, BoostableBosses};
use crate::{Error, Result};
use tracing::debug;

const MAIN_CONTENT_MARKER: &str = r#"<div class="main-content Content">"#;
const FOOTER_MARKER: &str = r#"<div id="Footer" class="main-footer">"#;

const TODAY_MARKER: &str = "Today's boosted boss: ";
const BOSSES_MARKER: &str = r#"<div class="CaptionContainer">"#;

const TODAY_NAME_START: &str = r#"title="Today's boosted boss: "#;
const TODAY_NAME_END: &str = r#"" src=""#;
const TODAY_IMAGE_START: &str = "https://static.tibia.com/images/global/header/monsters/";

const BOSS_IMAGE_START: &str = "https://static.tibia.com/images/library/";
const BOSS_NAME_START: &str = "border=0 /> <div>";
const BOSS_NAME_END: &str = "</div>";

const QUOTE: &str = "\"";

fn structure(detail: &str) -> Error {
    Error::Structure(format!("boostable bosses: {detail}"))
}

/// Extract today's boosted boss and the full boss list from the page markup.
pub fn extract_boostable_bosses(page: &str) -> Result<BoostableBosses> {
    let lines = content_lines(page)?;

    let mut boosted: Option<BoostableBoss> = None;
    for line in lines {
        if boosted.is_none() && line.contains(TODAY_MARKER) {
            boosted = Some(read_todays_line(line)?);
        }

        if line.contains(BOSSES_MARKER) {
            let boosted = boosted.ok_or_else(|| structure("boss list found before today's boss"))?;
            let bosses = read_bosses_line(line, &boosted.name)?;
            if bosses.len() != AMOUNT_OF_BOOSTABLE_BOSSES {
                debug!(
                    "Extracted {} bosses, expected {}",
                    bosses.len(),
                    AMOUNT_OF_BOOSTABLE_BOSSES
                );
            }
            return Ok(BoostableBosses { boosted, bosses });
        }
    }

    Err(if boosted.is_none() {
        structure("today's boss not found")
    } else {
        structure("boss list not found")
    })
}

/// Lines of the region between the main content and the footer.
fn content_lines(page: &str) -> Result<Vec<&str>> {
    let mut scanner = Scanner::new(page);
    scanner
        .seek(MAIN_CONTENT_MARKER)
        .ok_or_else(|| structure("main content not found"))?;
    let content = scanner
        .take_until(FOOTER_MARKER)
        .ok_or_else(|| structure("end of content not found"))?;

    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Err(structure("no lines found"));
    }
    Ok(lines)
}

fn read_todays_line(line: &str) -> Result<BoostableBoss> {
    let mut scanner = Scanner::new(line);

    scanner
        .skip_past(TODAY_NAME_START)
        .ok_or_else(|| structure("today boss idx not found"))?;
    let name = scanner
        .take_until(TODAY_NAME_END)
        .ok_or_else(|| structure("today boss end idx not found"))?;

    scanner
        .seek(TODAY_IMAGE_START)
        .ok_or_else(|| structure("today boss img idx not found"))?;
    let image_url = scanner
        .take_until(QUOTE)
        .ok_or_else(|| structure("today boss end img idx not found"))?;

    Ok(BoostableBoss {
        name: name.to_string(),
        image_url: image_url.to_string(),
        is_boosted: true,
    })
}

fn read_bosses_line(line: &str, boosted_name: &str) -> Result<Vec<BoostableBoss>> {
    let mut bosses = Vec::with_capacity(AMOUNT_OF_BOOSTABLE_BOSSES);
    let mut scanner = Scanner::new(line);

    while scanner.seek(BOSS_IMAGE_START).is_some() {
        let image_url = scanner
            .take_until(QUOTE)
            .ok_or_else(|| structure("end img idx not found"))?;

        scanner
            .skip_past(BOSS_NAME_START)
            .ok_or_else(|| structure("name idx not found"))?;
        let name = scanner
            .take_until(BOSS_NAME_END)
            .ok_or_else(|| structure("end name idx not found"))?;

        bosses.push(BoostableBoss {
            name: name.to_string(),
            image_url: image_url.to_string(),
            is_boosted: name == boosted_name,
        });
    }

    Ok(bosses)
}
