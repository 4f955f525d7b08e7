use scraper::{ElementRef, Html, Selector};
use tracing::warn;


/// A parsed HTML page, or a parsed fragment of one.
#[derive(Debug)]
pub(crate) struct Document(Html);


impl Document {
    pub(crate) fn parse(html: &str) -> Self {
        Self(Html::parse_document(html))
    }

    pub(crate) fn parse_fragment(html: &str) -> Self {
        Self(Html::parse_fragment(html))
    }

    pub(crate) fn root(&self) -> Node<'_> {
        Node(self.0.root_element())
    }

    pub(crate) fn find_by_id(&self, id: &str) -> Option<Node<'_>> {
        self.root().find_by_id(id)
    }

    pub(crate) fn find_all<S: AsRef<str>>(&self, tag: &str, classes: &[S]) -> Vec<Node<'_>> {
        self.root().find_all(tag, classes)
    }
}


/// An element inside a [`Document`].
///
/// Every search only looks at the element's descendants, never at the element itself.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Node<'a>(ElementRef<'a>);


impl<'a> Node<'a> {
    /// Descendants matching `css`, in document order. A selector that does not
    /// parse matches nothing.
    fn select(self, css: &str) -> Vec<Node<'a>> {
        let selector = match Selector::parse(css) {
            Ok(selector) => selector,
            Err(error) => {
                warn!(css, ?error, "Invalid selector, matching nothing");
                return Vec::new();
            }
        };
        let own_id = self.0.id();
        self.0
            .select(&selector)
            .filter(|x| x.id() != own_id)
            .map(Node)
            .collect()
    }

    pub(crate) fn name(self) -> &'a str {
        self.0.value().name()
    }

    pub(crate) fn attr(self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    pub(crate) fn has_class(self, class: &str) -> bool {
        self.0.value().classes().any(|x| x == class)
    }

    /// All text inside this element, concatenated without separators.
    pub(crate) fn text(self) -> String {
        self.0.text().collect()
    }

    pub(crate) fn html(self) -> String {
        self.0.html()
    }

    pub(crate) fn find_by_id(self, id: &str) -> Option<Node<'a>> {
        self.select(&format!("#{id}")).into_iter().next()
    }

    pub(crate) fn find_first(self, tag: &str) -> Option<Node<'a>> {
        self.select(tag).into_iter().next()
    }

    pub(crate) fn find_tag(self, tag: &str) -> Vec<Node<'a>> {
        self.select(tag)
    }

    /// Elements named `tag` that carry at least one of `classes`.
    pub(crate) fn find_all<S: AsRef<str>>(self, tag: &str, classes: &[S]) -> Vec<Node<'a>> {
        if classes.is_empty() {
            return Vec::new();
        }
        let css = classes
            .iter()
            .map(|class| format!("{tag}.{}", class.as_ref()))
            .collect::<Vec<_>>()
            .join(", ");
        self.select(&css)
    }

    pub(crate) fn find_by_attr(self, name: &str, value: &str) -> Option<Node<'a>> {
        let value = value.replace('\\', "\\\\").replace('"', "\\\"");
        self.select(&format!("[{name}=\"{value}\"]")).into_iter().next()
    }

    /// Later siblings named `tag`, in document order.
    pub(crate) fn next_siblings(self, tag: &str) -> Vec<Node<'a>> {
        self.0
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .map(Node)
            .filter(|x| x.name() == tag)
            .collect()
    }
}
