//! Namespace-aware XML document model with a small XPath subset.
//!
//! ELB responses put every element in a versioned default namespace
//! (`http://elasticloadbalancing.amazonaws.com/doc/2009-11-25/`). Queries
//! bind a short prefix to that URI and address elements as `elb:Name`, so an
//! element only matches when both its local name and its resolved namespace
//! agree.
//!
//! Supported expressions are location paths made of `prefix:name`, `name`
//! (no namespace) or `*` steps separated by `/`, optionally starting with
//! `//` (descendant-or-self of the document) and optionally ending in
//! `text()`.

use crate::error::{ElbError, ElbResult};
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// An element with its resolved namespace, direct text and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub local_name: String,
    /// Concatenated text and CDATA directly inside this element.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(namespace: Option<String>, local_name: String) -> Self {
        Self {
            namespace,
            local_name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// XPath string value: all descendant text in document order.
    pub fn string_value(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.string_value());
        }
        out
    }

    fn collect_descendants_or_self<'a>(&'a self, out: &mut Vec<&'a XmlElement>) {
        out.push(self);
        for child in &self.children {
            child.collect_descendants_or_self(out);
        }
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// Parse `xml`, resolving every element's namespace.
    pub fn parse(xml: &str) -> ElbResult<Self> {
        let mut reader = NsReader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader
                .read_resolved_event()
                .map(|(ns, event)| (resolved_namespace(ns), event));
            match event {
                Ok((ns, Event::Start(ref e))) => {
                    stack.push(XmlElement::new(ns, decode_name(e.local_name().as_ref())));
                }
                Ok((ns, Event::Empty(ref e))) => {
                    let element = XmlElement::new(ns, decode_name(e.local_name().as_ref()));
                    attach(&mut stack, &mut root, element)?;
                }
                Ok((_, Event::End(_))) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element)?;
                    }
                }
                Ok((_, Event::Text(ref t))) => {
                    if let Some(current) = stack.last_mut() {
                        let text = t.unescape()?;
                        current.text.push_str(&text);
                    }
                }
                Ok((_, Event::CData(c))) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok((_, Event::Eof)) => break,
                Err(e) => {
                    return Err(ElbError::parse(&format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ElbError::parse(&format!(
                "Unexpected end of document inside <{}>",
                open.local_name
            )));
        }
        root.map(|root| Self { root })
            .ok_or_else(|| ElbError::parse("Document has no root element"))
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }
}

fn resolved_namespace(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

fn decode_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> ElbResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(ElbError::parse("Document has more than one root element"))
    }
}

// ── XPath subset ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest<'e> {
    Any,
    Named {
        prefix: Option<&'e str>,
        local: &'e str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocationPath<'e> {
    from_document: bool,
    steps: Vec<NameTest<'e>>,
}

impl<'e> LocationPath<'e> {
    fn parse(expr: &'e str) -> Self {
        let (from_document, rest) = match expr.strip_prefix("//") {
            Some(rest) => (true, rest),
            None => (false, expr),
        };
        let steps = rest
            .split('/')
            .filter(|s| !s.is_empty() && *s != "text()")
            .map(|step| match step {
                "*" => NameTest::Any,
                _ => match step.split_once(':') {
                    Some((prefix, local)) => NameTest::Named {
                        prefix: Some(prefix),
                        local,
                    },
                    None => NameTest::Named {
                        prefix: None,
                        local: step,
                    },
                },
            })
            .collect();
        Self {
            from_document,
            steps,
        }
    }
}

/// XPath evaluator with one namespace prefix binding.
#[derive(Debug, Clone, Copy)]
pub struct XPath<'d> {
    document: &'d XmlDocument,
    prefix: &'d str,
    namespace: &'d str,
}

impl<'d> XPath<'d> {
    /// Bind `prefix` to `namespace` for queries against `document`.
    pub fn new(document: &'d XmlDocument, prefix: &'d str, namespace: &'d str) -> Self {
        Self {
            document,
            prefix,
            namespace,
        }
    }

    fn matches(&self, test: &NameTest<'_>, element: &XmlElement) -> bool {
        match test {
            NameTest::Any => true,
            NameTest::Named { prefix, local } => {
                if element.local_name != *local {
                    return false;
                }
                match prefix {
                    Some(p) if *p == self.prefix => {
                        element.namespace.as_deref() == Some(self.namespace)
                    }
                    // Unbound prefix
                    Some(_) => false,
                    None => element.namespace.is_none(),
                }
            }
        }
    }

    /// Evaluate `expr` from the document root.
    pub fn nodes(&self, expr: &str) -> Vec<&'d XmlElement> {
        self.evaluate(None, expr)
    }

    /// Evaluate `expr` relative to `context` (absolute `//` paths ignore it).
    pub fn nodes_from(&self, context: &'d XmlElement, expr: &str) -> Vec<&'d XmlElement> {
        self.evaluate(Some(context), expr)
    }

    /// String value of the first node selected by `expr`, or `""`.
    pub fn string(&self, expr: &str) -> String {
        self.nodes(expr)
            .first()
            .map(|n| n.string_value())
            .unwrap_or_default()
    }

    /// String value of the first node selected by `expr` from `context`, or `""`.
    pub fn string_from(&self, context: &'d XmlElement, expr: &str) -> String {
        self.nodes_from(context, expr)
            .first()
            .map(|n| n.string_value())
            .unwrap_or_default()
    }

    fn evaluate(&self, context: Option<&'d XmlElement>, expr: &str) -> Vec<&'d XmlElement> {
        let path = LocationPath::parse(expr);
        let mut steps = path.steps.iter();

        let mut current: Vec<&'d XmlElement> = match (path.from_document, context) {
            (true, _) => {
                let Some(first) = steps.next() else {
                    return vec![self.document.root()];
                };
                let mut all = Vec::new();
                self.document.root().collect_descendants_or_self(&mut all);
                all.into_iter().filter(|e| self.matches(first, e)).collect()
            }
            (false, Some(ctx)) => vec![ctx],
            // The document node's only child is the root element.
            (false, None) => {
                let Some(first) = steps.next() else {
                    return vec![self.document.root()];
                };
                let root = self.document.root();
                if self.matches(first, root) {
                    vec![root]
                } else {
                    Vec::new()
                }
            }
        };

        for step in steps {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter())
                .filter(|child| self.matches(step, child))
                .collect();
        }
        current
    }
}
