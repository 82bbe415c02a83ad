//! View and workbook export to PNG / PDF.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;

use crate::client::TableauClient;
use crate::error::TableauError;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        })
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

/// Paper sizes accepted by the PDF endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageType {
    A3,
    A4,
    A5,
    B4,
    B5,
    Executive,
    Folio,
    Ledger,
    Legal,
    #[default]
    Letter,
    Note,
    Quarto,
    Tabloid,
    Unspecified,
}

const PAGE_TYPES: [(PageType, &str); 14] = [
    (PageType::A3, "A3"),
    (PageType::A4, "A4"),
    (PageType::A5, "A5"),
    (PageType::B4, "B4"),
    (PageType::B5, "B5"),
    (PageType::Executive, "Executive"),
    (PageType::Folio, "Folio"),
    (PageType::Ledger, "Ledger"),
    (PageType::Legal, "Legal"),
    (PageType::Letter, "Letter"),
    (PageType::Note, "Note"),
    (PageType::Quarto, "Quarto"),
    (PageType::Tabloid, "Tabloid"),
    (PageType::Unspecified, "Unspecified"),
];

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = PAGE_TYPES
            .iter()
            .find(|(p, _)| p == self)
            .map(|(_, n)| *n)
            .unwrap_or("Unspecified");
        f.write_str(name)
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PAGE_TYPES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(s))
            .map(|(p, _)| *p)
            .ok_or_else(|| format!("unknown page type '{s}'"))
    }
}

/// Layout of a single-view PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfOptions {
    pub orientation: Orientation,
    pub page_type: PageType,
    /// Viz width in pixels.
    pub viz_width: u32,
    /// Viz height in pixels.
    pub viz_height: u32,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            page_type: PageType::Letter,
            viz_width: 1024,
            viz_height: 768,
        }
    }
}

impl<T: Transport> TableauClient<T> {
    /// PNG rendering of a view.
    pub fn query_view_image(&self, view_id: &str) -> Result<Vec<u8>, TableauError> {
        let url = self.site_url(&format!("views/{}/image", urlencoding::encode(view_id)))?;
        self.download(url)
    }

    /// PDF rendering of a single view.
    pub fn query_view_pdf(&self, view_id: &str, options: &PdfOptions) -> Result<Vec<u8>, TableauError> {
        let url = self.site_url(&format!(
            "views/{}/pdf?orientation={}&type={}&vizWidth={}&vizHeight={}",
            urlencoding::encode(view_id),
            options.orientation,
            options.page_type,
            options.viz_width,
            options.viz_height
        ))?;
        self.download(url)
    }

    /// PDF of every sheet in a workbook.
    pub fn download_workbook_pdf(
        &self,
        workbook_id: &str,
        orientation: Orientation,
        page_type: PageType,
    ) -> Result<Vec<u8>, TableauError> {
        let url = self.site_url(&format!(
            "workbooks/{}/pdf?orientation={}&type={}",
            urlencoding::encode(workbook_id),
            orientation,
            page_type
        ))?;
        self.download(url)
    }

    fn download(&self, url: String) -> Result<Vec<u8>, TableauError> {
        let response = self.send(self.authed(Method::GET, url)?)?;
        if response.status != 200 {
            let err = TableauError::service(&response);
            tracing::error!(status = response.status, body = %response.text(), "export failed");
            return Err(err);
        }
        tracing::debug!(bytes = response.body.len(), "export downloaded");
        Ok(response.body)
    }
}
