use base64::Engine;

use crate::charts::ChartImage;
use crate::report::ReportHeader;

/// Render the downloadable Markdown report. Charts are embedded as inline
/// PNG data URIs in slot order; slots without an image are skipped.
pub fn render(header: &ReportHeader<'_>, narrative: &str, images: &[ChartImage]) -> String {
    let mut out = String::new();
    out.push_str("# Client Analytics Report\n\n");
    out.push_str(&format!("**Generated on:** {}  \n", header.generated_on()));
    out.push_str(&format!("**Generated by:** {}  \n", header.generated_by));
    out.push_str(&format!("**Client:** {}\n\n", header.client_name));
    out.push_str("---\n\n");
    out.push_str(narrative.trim_end());
    out.push_str("\n\n---\n");

    if !images.is_empty() {
        out.push_str("\n## Visual Analytics\n");
        let mut sorted: Vec<&ChartImage> = images.iter().collect();
        sorted.sort_by_key(|image| image.slot);
        for image in sorted {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&image.png);
            out.push_str(&format!(
                "\n### {}\n{}\n\n![{}](data:image/png;base64,{})\n",
                image.title,
                image.slot.description(),
                image.slot.binding(),
                encoded
            ));
        }
        out.push_str("\n---\n");
    }

    out.push_str(SUMMARY);
    out
}

const SUMMARY: &str = "
## Report Summary

This analysis covers:
- **Client demographic and contract insights**
- **6-month service performance trends**
- **Current SLA compliance metrics**
- **Issue category analysis with resolution patterns**
- **Escalation effectiveness assessment**

**Next Steps:**
1. Review identified areas for improvement
2. Implement recommended process changes
3. Monitor progress against established benchmarks
4. Schedule follow-up analysis in 30 days

---

*Report generated by client-analytics*
";
