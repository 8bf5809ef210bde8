//! Full report page: host boilerplate around the attempt fragment, plus DOM
//! post-processing.
//!
//! The DOM is parsed twice. The first pass only collects image sources, so
//! no `Rc` tree is alive while images are fetched.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use tracing::Instrument;

use crate::error::ReportError;
use crate::host::PageRenderer;
use crate::report::{AttemptReport, ImageInliner, InlineOutcome, SectionSet};

/// Body class of report pages. Themes can target it with extra CSS.
pub const REPORT_BODY_CLASS: &str = "quiz-archiver-report";

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

const MINIMAL_CSS: &str = "
nav.navbar {
    display: none !important;
}

footer {
    display: none !important;
}

div#page {
    margin-top: 0 !important;
    padding-left: 0 !important;
    padding-right: 0 !important;
    height: initial !important;
}

div#page-wrapper {
    height: initial !important;
}

.stackinputerror {
    display: none !important;
}
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Add `<base href>` pointing at the site.
    pub fix_relative_urls: bool,
    /// Hide navigation and footer.
    pub minimal: bool,
    pub inline_images: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            fix_relative_urls: true,
            minimal: true,
            inline_images: true,
        }
    }
}

impl AttemptReport<'_> {
    /// Complete HTML page of one attempt.
    pub async fn generate_full_page(
        &self,
        attempt_id: i64,
        sections: &SectionSet,
        options: PageOptions,
        inliner: &ImageInliner<'_>,
        exported_at: DateTime<Utc>,
    ) -> Result<String, ReportError> {
        let fragment = self.generate(attempt_id, sections, exported_at)?;
        build_full_page(self.host(), &fragment, self.wwwroot(), options, inliner)
            .instrument(tracing::info_span!("full_page", attempt_id))
            .await
    }
}

/// Wraps `fragment` in the host's header and footer and post-processes it.
pub async fn build_full_page(
    host: &dyn PageRenderer,
    fragment: &str,
    site_url: &str,
    options: PageOptions,
    inliner: &ImageInliner<'_>,
) -> Result<String, ReportError> {
    let html = format!(
        "{}{}{}",
        host.page_header(REPORT_BODY_CLASS),
        fragment,
        host.page_footer()
    );

    let mut outcomes = Vec::new();
    if options.inline_images {
        let sources = collect_image_sources(&html);
        for src in &sources {
            outcomes.push(inliner.inline(src.as_deref()).await);
        }
        let inlined = outcomes.iter().filter(|o| o.is_inlined()).count();
        log::debug!("Inlined {} of {} images", inlined, outcomes.len());
    }

    rewrite_document(&html, site_url, options, &outcomes)
}

fn parse(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// `src` of every `<img>` in document order.
fn collect_image_sources(html: &str) -> Vec<Option<String>> {
    let dom = parse(html);
    let mut images = Vec::new();
    find_elements(&dom.document, "img", &mut images);
    images.iter().map(|img| get_attribute(img, "src")).collect()
}

fn rewrite_document(
    html: &str,
    site_url: &str,
    options: PageOptions,
    outcomes: &[InlineOutcome],
) -> Result<String, ReportError> {
    let dom = parse(html);

    if options.fix_relative_urls || options.minimal {
        let mut heads = Vec::new();
        find_elements(&dom.document, "head", &mut heads);
        let head = heads.first().ok_or(ReportError::MissingHead)?;

        if options.fix_relative_urls {
            append_child(head, create_element("base", &[("href", site_url)]));
        }
        if options.minimal {
            let style = create_element("style", &[]);
            append_child(
                &style,
                Node::new(NodeData::Text {
                    contents: RefCell::new(MINIMAL_CSS.into()),
                }),
            );
            append_child(head, style);
        }
    }

    if options.inline_images {
        let mut images = Vec::new();
        find_elements(&dom.document, "img", &mut images);
        for (img, outcome) in images.iter().zip(outcomes) {
            apply_outcome(img, outcome);
        }
    }

    let mut out = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut out, &document, SerializeOpts::default()).map_err(ReportError::Serialize)?;
    String::from_utf8(out).map_err(|e| {
        ReportError::Serialize(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

fn apply_outcome(img: &Handle, outcome: &InlineOutcome) {
    for (name, value) in outcome.attributes() {
        set_attribute(img, name, &value);
    }
    if let Some(data_uri) = &outcome.data_uri {
        set_attribute(img, "src", data_uri);
    }
}

fn is_html_element(handle: &Handle, local: &str) -> bool {
    match &handle.data {
        NodeData::Element { name, .. } => &*name.ns == XHTML_NS && &*name.local == local,
        _ => false,
    }
}

fn find_elements(handle: &Handle, local: &str, out: &mut Vec<Handle>) {
    if is_html_element(handle, local) {
        out.push(handle.clone());
    }
    for child in handle.children.borrow().iter() {
        find_elements(child, local, out);
    }
}

fn get_attribute(handle: &Handle, name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.ns.is_empty() && &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn set_attribute(handle: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &handle.data {
        let mut attrs = attrs.borrow_mut();
        match attrs
            .iter_mut()
            .find(|a| a.name.ns.is_empty() && &*a.name.local == name)
        {
            Some(existing) => existing.value = value.into(),
            None => attrs.push(attribute(name, value)),
        }
    }
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
        value: value.into(),
    }
}

fn create_element(local: &str, attrs: &[(&str, &str)]) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, Namespace::from(XHTML_NS), LocalName::from(local)),
        attrs: RefCell::new(attrs.iter().map(|(n, v)| attribute(n, v)).collect()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}
