//! HTML pedigree documents
//!
//! Renders a traversal result as a self-contained page. Every value taken
//! from a record goes through [`escape_html`] before it reaches the markup.

use std::fmt;

use super::traversal::{AncestryNode, Traversal};

/// Escapes text for use in HTML element content and quoted attributes
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Renders a full HTML document for a traversal result
///
/// Unknown animals and cyclic ancestry render as an error page.
pub fn render_document(traversal: &Traversal) -> String {
    match traversal {
        Traversal::Found(root) => tree_page(root),
        Traversal::NotFound(id) => error_page(&format!("Animal not found: {}", id)),
        Traversal::Cyclic { animal, ancestor } => error_page(&format!(
            "Ancestry cannot be safely computed: cyclic parent reference from {} to {}",
            animal, ancestor
        )),
    }
}

fn tree_page(root: &AncestryNode) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Pedigree of {name}</title>
    <style>
{css}
    </style>
</head>
<body>
    <header>
        <h1>Pedigree of {name}</h1>
        <p class="generations">{generations} generation(s)</p>
    </header>

    <main>
        <section class="tree">
{tree}        </section>

        <aside id="detail" class="detail" hidden>
            <h2 id="detail-name"></h2>
            <dl>
                <dt>Id</dt><dd id="detail-id"></dd>
                <dt>Gender</dt><dd id="detail-gender"></dd>
                <dt>Classification</dt><dd id="detail-class"></dd>
                <dt>Born</dt><dd id="detail-born"></dd>
                <dt>Color</dt><dd id="detail-color"></dd>
                <dt>Breeder</dt><dd id="detail-breeder"></dd>
            </dl>
        </aside>
    </main>

    <script>
{js}
    </script>
</body>
</html>
"#,
        css = CSS,
        js = JS,
        name = escape_html(&root.name),
        generations = root.generations(),
        tree = Branch {
            node: root,
            role: None,
            indent: 2,
        },
    )
}

/// One tree node followed by its nested parent branches
struct Branch<'a> {
    node: &'a AncestryNode,
    role: Option<&'a str>,
    indent: usize,
}

impl Branch<'_> {
    fn parent<'n>(&self, node: &'n AncestryNode, role: &'static str) -> Branch<'n> {
        Branch {
            node,
            role: Some(role),
            indent: self.indent + 2,
        }
    }
}

impl fmt::Display for Branch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node;
        let pad = "    ".repeat(self.indent);
        let born = node
            .birth_year()
            .map(|y| y.to_string())
            .unwrap_or_default();

        writeln!(f, "{pad}<div class=\"branch\">")?;
        writeln!(
            f,
            "{pad}    <div class=\"node {gender}\" data-animal-id=\"{id}\" data-name=\"{name}\" \
             data-gender=\"{gender}\" data-class=\"{class}\" data-born=\"{born}\" \
             data-color=\"{color}\" data-breeder=\"{breeder}\">",
            pad = pad,
            id = escape_html(&node.id.to_string()),
            name = escape_html(&node.name),
            gender = escape_html(node.gender.as_str()),
            class = escape_html(node.classification.as_str()),
            born = escape_html(&born),
            color = escape_html(node.color.as_deref().unwrap_or("")),
            breeder = escape_html(node.breeder.as_deref().unwrap_or("")),
        )?;
        if let Some(role) = self.role {
            writeln!(f, "{pad}        <span class=\"role\">{}</span>", escape_html(role))?;
        }
        writeln!(
            f,
            "{pad}        <span class=\"name\">{}</span>",
            escape_html(&node.name)
        )?;
        writeln!(
            f,
            "{pad}        <span class=\"meta\">{} &middot; {}</span>",
            escape_html(node.gender.as_str()),
            escape_html(node.classification.as_str())
        )?;
        if !born.is_empty() {
            writeln!(f, "{pad}        <span class=\"born\">{}</span>", escape_html(&born))?;
        }
        writeln!(f, "{pad}    </div>")?;

        if !node.is_leaf() {
            writeln!(f, "{pad}    <div class=\"parents\">")?;
            if let Some(sire) = &node.sire {
                write!(f, "{}", self.parent(sire, "Sire"))?;
            }
            if let Some(dam) = &node.dam {
                write!(f, "{}", self.parent(dam, "Dam"))?;
            }
            writeln!(f, "{pad}    </div>")?;
        }

        writeln!(f, "{pad}</div>")
    }
}

fn error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Pedigree unavailable</title>
    <style>
{css}
    </style>
</head>
<body>
    <main>
        <h1 class="error">Error</h1>
        <p class="message">{message}</p>
    </main>
</body>
</html>
"#,
        css = CSS,
        message = escape_html(message),
    )
}

const CSS: &str = r#"        * { box-sizing: border-box; }
        body {
            margin: 0;
            font-family: system-ui, -apple-system, sans-serif;
            background: #f6f4ef;
            color: #2b2b2b;
        }
        header { padding: 1rem 2rem; background: #3d5a40; color: #fff; }
        header h1 { margin: 0; font-size: 1.4rem; }
        .generations { margin: 0.25rem 0 0; opacity: 0.8; }
        main { display: flex; gap: 1.5rem; padding: 1.5rem 2rem; }
        .tree { flex: 1; overflow-x: auto; }
        .branch { display: flex; align-items: center; }
        .parents {
            display: flex;
            flex-direction: column;
            gap: 0.5rem;
            margin-left: 1.5rem;
            padding-left: 1rem;
            border-left: 2px solid #b8b1a2;
        }
        .node {
            min-width: 11rem;
            padding: 0.5rem 0.75rem;
            border: 1px solid #b8b1a2;
            border-radius: 6px;
            background: #fff;
            cursor: pointer;
        }
        .node:hover, .node.selected { border-color: #3d5a40; box-shadow: 0 0 0 2px #3d5a4033; }
        .node.male { border-top: 4px solid #4a6fa5; }
        .node.female { border-top: 4px solid #b5577b; }
        .node.neutered { border-top: 4px solid #8a8a8a; }
        .node span { display: block; }
        .role { font-size: 0.7rem; text-transform: uppercase; color: #777; }
        .name { font-weight: 600; }
        .meta, .born { font-size: 0.85rem; color: #555; }
        .detail {
            width: 18rem;
            padding: 1rem;
            border-radius: 6px;
            background: #fff;
            border: 1px solid #b8b1a2;
            align-self: flex-start;
        }
        .detail dt { font-weight: 600; margin-top: 0.5rem; }
        .detail dd { margin: 0; }
        .error { color: #a33; }

        @media (max-width: 720px) {
            main { flex-direction: column; padding: 1rem; }
            .branch { flex-direction: column; align-items: flex-start; }
            .parents { margin-left: 0.75rem; padding-left: 0.5rem; }
            .detail { width: 100%; }
        }"#;

const JS: &str = r#"        const detail = document.getElementById('detail');
        const fields = {
            name: document.getElementById('detail-name'),
            animalId: document.getElementById('detail-id'),
            gender: document.getElementById('detail-gender'),
            class: document.getElementById('detail-class'),
            born: document.getElementById('detail-born'),
            color: document.getElementById('detail-color'),
            breeder: document.getElementById('detail-breeder'),
        };

        document.querySelectorAll('.node').forEach((node) => {
            node.addEventListener('click', () => {
                document.querySelectorAll('.node.selected').forEach((n) => n.classList.remove('selected'));
                node.classList.add('selected');

                for (const [key, el] of Object.entries(fields)) {
                    el.textContent = node.dataset[key] || '-';
                }
                detail.hidden = false;
            });
        });"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Animal, AnimalId, Classification, Gender};
    use crate::pedigree::build_tree;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("O'Brien & Sons"), "O&#39;Brien &amp; Sons");
    }

    #[test]
    fn hostile_names_are_escaped() {
        let sire = Animal::new(r#"<script>alert("x")</script>"#, Gender::Male, Classification::A);
        let foal = Animal::new("Foal <b>", Gender::Female, Classification::A)
            .with_sire(sire.id.clone());
        let store = MemoryStore::with_animals([sire, foal.clone()]);

        let html = render_document(&build_tree(&store, &foal.id, 1).unwrap());

        assert!(html.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"));
        assert!(html.contains("Foal &lt;b&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn not_found_renders_error_page() {
        let store = MemoryStore::new();
        let id: AnimalId = "h-deadbee".parse().unwrap();

        let html = render_document(&build_tree(&store, &id, 2).unwrap());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<h1 class="error">Error</h1>"#));
        assert!(html.contains("Animal not found: h-deadbee"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn cyclic_ancestry_renders_error_page() {
        let mut x = Animal::new("X", Gender::Male, Classification::A);
        let mut y = Animal::new("Y", Gender::Male, Classification::A);
        x.sire = Some(y.id.clone());
        y.sire = Some(x.id.clone());
        let store = MemoryStore::with_animals([x.clone(), y]);

        let html = render_document(&build_tree(&store, &x.id, 3).unwrap());

        assert!(html.contains(r#"class="error""#));
        assert!(html.contains("cannot be safely computed"));
    }

    #[test]
    fn depth_zero_renders_single_node() {
        let sire = Animal::new("Sire", Gender::Male, Classification::A);
        let foal = Animal::new("Foal", Gender::Female, Classification::AB)
            .with_sire(sire.id.clone())
            .with_birth_date(NaiveDate::from_ymd_opt(2019, 4, 2).unwrap());
        let store = MemoryStore::with_animals([sire, foal.clone()]);

        let html = render_document(&build_tree(&store, &foal.id, 0).unwrap());

        assert_eq!(html.matches("data-animal-id=").count(), 1);
        assert!(!html.contains(r#"<div class="parents">"#));
        assert!(html.contains(r#"<span class="born">2019</span>"#));
        assert!(!html.contains(r#"class="error""#));
    }

    #[test]
    fn parents_nest_under_child() {
        let sire = Animal::new("Sire", Gender::Male, Classification::A);
        let dam = Animal::new("Dam", Gender::Female, Classification::B);
        let foal = Animal::new("Foal", Gender::Female, Classification::AB)
            .with_sire(sire.id.clone())
            .with_dam(dam.id.clone());
        let store = MemoryStore::with_animals([sire.clone(), dam, foal.clone()]);

        let html = render_document(&build_tree(&store, &foal.id, 2).unwrap());

        assert_eq!(html.matches("data-animal-id=").count(), 3);
        let foal_at = html.find(r#"data-name="Foal""#).unwrap();
        let parents_at = html.find(r#"<div class="parents">"#).unwrap();
        let sire_at = html.find(r#"data-name="Sire""#).unwrap();
        let dam_at = html.find(r#"data-name="Dam""#).unwrap();
        assert!(foal_at < parents_at && parents_at < sire_at && sire_at < dam_at);
        assert!(html.contains(&format!(r#"data-animal-id="{}""#, sire.id)));
    }

    #[test]
    fn page_is_self_contained() {
        let solo = Animal::new("Solo", Gender::Neutered, Classification::C);
        let store = MemoryStore::with_animals([solo.clone()]);

        let html = render_document(&build_tree(&store, &solo.id, 1).unwrap());

        assert!(html.contains("<style>"));
        assert!(html.contains("@media"));
        assert!(html.contains("<script>"));
        assert!(html.contains("addEventListener('click'"));
        assert!(html.contains("dataset"));
    }
}
