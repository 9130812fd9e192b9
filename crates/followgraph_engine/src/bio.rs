use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Renders a biography's markup as plain text for terminal display.
///
/// Paragraphs become blank-line separated, `<br>` becomes a newline, and the
/// `invisible` spans servers use to shorten long links are dropped.
pub fn note_to_plain_text(note: &str) -> String {
    let fragment = Html::parse_fragment(note);
    let mut text = PlainText::default();
    for child in fragment.root_element().children() {
        visit_node(child, &mut text);
    }
    text.finish()
}

fn visit_node(node: NodeRef<'_, Node>, text: &mut PlainText) {
    match node.value() {
        Node::Text(content) => text.append(content),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                visit_element(element, text);
            }
        }
        _ => {
            for child in node.children() {
                visit_node(child, text);
            }
        }
    }
}

fn visit_element(element: ElementRef<'_>, text: &mut PlainText) {
    if element.value().classes().any(|class| class == "invisible") {
        return;
    }
    match element.value().name() {
        "br" => text.newline(),
        "p" | "div" | "blockquote" | "li" => {
            text.paragraph();
            visit_children(element, text);
            text.paragraph();
        }
        "script" | "style" | "template" => {}
        _ => visit_children(element, text),
    }
}

fn visit_children(element: ElementRef<'_>, text: &mut PlainText) {
    for child in element.children() {
        visit_node(child, text);
    }
}

#[derive(Default)]
struct PlainText {
    out: String,
    pending_breaks: usize,
}

impl PlainText {
    fn append(&mut self, content: &str) {
        for ch in content.chars() {
            if ch.is_whitespace() {
                if self.pending_breaks == 0 && !self.out.is_empty() && !self.out.ends_with(' ') {
                    self.out.push(' ');
                }
                continue;
            }
            self.flush_breaks();
            self.out.push(ch);
        }
    }

    fn newline(&mut self) {
        self.pending_breaks = self.pending_breaks.max(1);
    }

    fn paragraph(&mut self) {
        self.pending_breaks = 2;
    }

    fn flush_breaks(&mut self) {
        if self.pending_breaks > 0 && !self.out.is_empty() {
            let trimmed = self.out.trim_end_matches(' ').len();
            self.out.truncate(trimmed);
            for _ in 0..self.pending_breaks {
                self.out.push('\n');
            }
        }
        self.pending_breaks = 0;
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }
}
