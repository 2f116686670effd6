#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub labels: usize,
    pub command_count: usize,
    pub content_bytes: usize,
    pub render_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetMetrics {
    pub pages: Vec<PageMetrics>,
    pub labels: usize,
    pub lines: usize,
    pub unresolved_placeholders: usize,
    pub total_render_ms: f64,
    pub total_bytes: usize,
}

impl SheetMetrics {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn command_count(&self) -> usize {
        self.pages.iter().map(|page| page.command_count).sum()
    }
}
