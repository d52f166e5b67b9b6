use std::fmt;

use serde::Serialize;

/// A node of a message's body structure.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct MimeNode {
    pub media_type: String,
    pub subtype: String,
    pub params: Vec<(String, String)>,
    pub disposition: Option<Disposition>,
    pub encoding: Option<String>,
    pub size: Option<u64>,
    pub children: Vec<MimeNode>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct Disposition {
    pub kind: String,
    pub params: Vec<(String, String)>,
}

/// Dot-separated, 1-based section number such as `1.2`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(into = "String")]
pub struct PartPath(pub Vec<u32>);

impl PartPath {
    pub fn root() -> Self {
        Self(vec![1])
    }

    pub fn child(&self, position: u32) -> Self {
        let mut segments = self.0.clone();
        segments.push(position);
        Self(segments)
    }
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<PartPath> for String {
    fn from(path: PartPath) -> Self {
        path.to_string()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct AttachmentDescriptor {
    pub index: usize,
    pub part_path: PartPath,
    pub filename: String,
    pub content_type: String,
    pub size: Option<u64>,
    #[serde(skip)]
    pub encoding: Option<String>,
}

impl MimeNode {
    pub fn leaf(media_type: &str, subtype: &str) -> Self {
        Self {
            media_type: media_type.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn multipart(subtype: &str, children: Vec<MimeNode>) -> Self {
        Self {
            media_type: "multipart".to_string(),
            subtype: subtype.to_ascii_lowercase(),
            children,
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_disposition(mut self, kind: &str, filename: Option<&str>) -> Self {
        let params = filename
            .map(|name| vec![("filename".to_string(), name.to_string())])
            .unwrap_or_default();
        self.disposition = Some(Disposition {
            kind: kind.to_ascii_lowercase(),
            params,
        });
        self
    }

    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.media_type.eq_ignore_ascii_case("multipart")
    }

    pub fn content_type(&self) -> String {
        format!("{}/{}", self.media_type, self.subtype).to_ascii_lowercase()
    }

    /// Filename from the disposition, falling back to the Content-Type `name`.
    pub fn filename(&self) -> Option<&str> {
        self.disposition
            .as_ref()
            .and_then(|disposition| param(&disposition.params, "filename"))
            .or_else(|| param(&self.params, "name"))
            .filter(|name| !name.trim().is_empty())
    }

    fn disposition_is(&self, kind: &str) -> bool {
        self.disposition
            .as_ref()
            .is_some_and(|disposition| disposition.kind.eq_ignore_ascii_case(kind))
    }

    /// Whether this leaf should be offered as an attachment.
    pub fn is_attachment(&self) -> bool {
        if self.is_multipart() {
            return false;
        }
        if self.filename().is_some() || self.disposition_is("attachment") {
            return true;
        }
        !self.media_type.eq_ignore_ascii_case("text") && !self.disposition_is("inline")
    }
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value.as_str())
}

/// Enumerates attachment leaves in pre-order.
pub fn walk(root: &MimeNode) -> Vec<AttachmentDescriptor> {
    let mut found = Vec::new();
    if root.is_multipart() {
        for (position, child) in root.children.iter().enumerate() {
            collect(child, PartPath(vec![position as u32 + 1]), &mut found);
        }
    } else {
        collect(root, PartPath::root(), &mut found);
    }
    found
}

fn collect(node: &MimeNode, path: PartPath, found: &mut Vec<AttachmentDescriptor>) {
    if node.is_multipart() {
        for (position, child) in node.children.iter().enumerate() {
            collect(child, path.child(position as u32 + 1), found);
        }
        return;
    }

    if node.is_attachment() {
        let index = found.len();
        found.push(describe(node, path, index));
    }
}

fn describe(node: &MimeNode, part_path: PartPath, index: usize) -> AttachmentDescriptor {
    AttachmentDescriptor {
        index,
        part_path,
        filename: node
            .filename()
            .map(str::to_string)
            .unwrap_or_else(|| format!("attachment_{index}")),
        content_type: node.content_type(),
        size: node.size,
        encoding: node.encoding.clone(),
    }
}

/// Number of attachment leaves under `node`, including `node` itself.
pub fn count_attachments(node: &MimeNode) -> usize {
    if node.is_multipart() {
        node.children.iter().map(count_attachments).sum()
    } else {
        usize::from(node.is_attachment())
    }
}

/// Finds the attachment with the given pre-order index.
pub fn locate(root: &MimeNode, index: usize) -> Option<AttachmentDescriptor> {
    let mut skipped = 0;
    if root.is_multipart() {
        descend(&root.children, PartPath(Vec::new()), index, &mut skipped)
    } else if index == 0 && root.is_attachment() {
        Some(describe(root, PartPath::root(), 0))
    } else {
        None
    }
}

fn descend(
    children: &[MimeNode],
    parent: PartPath,
    index: usize,
    skipped: &mut usize,
) -> Option<AttachmentDescriptor> {
    for (position, child) in children.iter().enumerate() {
        let count = count_attachments(child);
        if *skipped + count <= index {
            *skipped += count;
            continue;
        }

        let path = parent.child(position as u32 + 1);
        if child.is_multipart() {
            return descend(&child.children, path, index, skipped);
        }
        return Some(describe(child, path, index));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MimeNode {
        MimeNode::multipart(
            "mixed",
            vec![
                MimeNode::multipart(
                    "alternative",
                    vec![MimeNode::leaf("text", "plain"), MimeNode::leaf("text", "html")],
                ),
                MimeNode::leaf("application", "pdf")
                    .with_disposition("attachment", Some("report.pdf"))
                    .with_encoding("base64")
                    .with_size(2048),
                MimeNode::multipart(
                    "related",
                    vec![
                        MimeNode::leaf("image", "png").with_disposition("inline", None),
                        MimeNode::leaf("image", "jpeg").with_param("name", "photo.jpg"),
                    ],
                ),
                MimeNode::leaf("text", "csv").with_disposition("attachment", None),
            ],
        )
    }

    #[test]
    fn walks_attachments_in_pre_order() {
        let found = walk(&sample());
        let summary = found
            .iter()
            .map(|a| (a.index, a.part_path.to_string(), a.filename.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (0, "2".to_string(), "report.pdf"),
                (1, "3.2".to_string(), "photo.jpg"),
                (2, "4".to_string(), "attachment_2"),
            ]
        );
        assert_eq!(found[0].content_type, "application/pdf");
        assert_eq!(found[0].size, Some(2048));
    }

    #[test]
    fn locate_agrees_with_walk() {
        let root = sample();
        let all = walk(&root);
        for descriptor in &all {
            assert_eq!(locate(&root, descriptor.index).as_ref(), Some(descriptor));
        }
        assert_eq!(locate(&root, all.len()), None);
        assert_eq!(count_attachments(&root), all.len());
    }

    #[test]
    fn single_part_body_is_part_one() {
        let root = MimeNode::leaf("application", "zip").with_param("name", "a.zip");
        let found = walk(&root);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].part_path, PartPath::root());
        assert_eq!(locate(&root, 0).map(|a| a.filename), Some("a.zip".to_string()));
    }

    #[test]
    fn plain_text_message_has_no_attachments() {
        let root = MimeNode::leaf("text", "plain");
        assert!(walk(&root).is_empty());
        assert_eq!(locate(&root, 0), None);
    }

    #[test]
    fn part_paths_render_dotted() {
        assert_eq!(PartPath(vec![1, 2, 3]).to_string(), "1.2.3");
        assert_eq!(PartPath::root().child(4).to_string(), "1.4");
    }
}
