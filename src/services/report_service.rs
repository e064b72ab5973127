// src/services/report_service.rs

use std::path::PathBuf;

use chrono::Local;
use genpdf::{elements, style, Element};

use crate::{common::error::AppError, models::dashboard::DashboardView};

pub const REPORT_TITLE: &str = "Relatório InovaTech - KPIs";

/// Texto do relatório, já filtrado pelo que a sessão pode ver.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    pub period: String,
    pub kpis: Vec<String>,
    pub suggestions: Vec<String>,
}

impl From<&DashboardView> for KpiReport {
    // `view.kpis` já vem sem churn para cliente
    fn from(view: &DashboardView) -> Self {
        Self {
            period: view.query.period.clone(),
            kpis: view.kpis.iter().map(|(k, v)| format!("{}: {}", k, v)).collect(),
            suggestions: view.suggestions.iter().map(|s| format!("• {}", s)).collect(),
        }
    }
}

#[derive(Clone)]
pub struct ReportService {
    font_dir: PathBuf,
    font_name: String,
}

impl ReportService {
    pub fn new(font_dir: impl Into<PathBuf>, font_name: impl Into<String>) -> Self {
        Self { font_dir: font_dir.into(), font_name: font_name.into() }
    }

    pub fn render_kpi_report(&self, view: &DashboardView) -> Result<Vec<u8>, AppError> {
        let report = KpiReport::from(view);

        // 1. Fonte (arquivos <nome>-Regular/Bold/Italic/BoldItalic.ttf)
        let font_family = genpdf::fonts::from_files(&self.font_dir, &self.font_name, None).map_err(|e| {
            AppError::FontNotFound(format!(
                "Fonte {} não encontrada em {}: {}",
                self.font_name,
                self.font_dir.display(),
                e
            ))
        })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(REPORT_TITLE);
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // 2. Cabeçalho
        doc.push(elements::Paragraph::new(REPORT_TITLE).styled(style::Style::new().bold().with_font_size(16)));
        doc.push(
            elements::Paragraph::new(format!(
                "Período: {} | Gerado em {}",
                report.period,
                Local::now().format("%d/%m/%Y %H:%M")
            ))
            .styled(style::Style::new().with_font_size(9)),
        );
        doc.push(elements::Break::new(1.5));

        // 3. KPIs
        for line in report.kpis {
            doc.push(elements::Paragraph::new(line));
        }
        doc.push(elements::Break::new(1));

        // 4. Sugestões
        doc.push(elements::Paragraph::new("Sugestões:").styled(style::Style::new().bold()));
        for line in report.suggestions {
            doc.push(elements::Paragraph::new(line));
        }

        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Falha ao gerar PDF: {}", e)))?;

        tracing::debug!("Relatório de KPIs gerado ({} bytes)", buffer.len());
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dashboard::KpiMap;

    fn view_with(kpis: &[(&str, f64)], suggestions: &[&str]) -> DashboardView {
        DashboardView {
            kpis: kpis.iter().map(|(k, v)| (k.to_string(), *v)).collect::<KpiMap>(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn report_lists_kpis_and_suggestions() {
        let view = view_with(&[("pedidos", 10.0), ("ticketMedio", 12.5)], &["Ative cupom no iFood"]);
        let report = KpiReport::from(&view);

        assert_eq!(report.kpis, vec!["pedidos: 10", "ticketMedio: 12.5"]);
        assert_eq!(report.suggestions, vec!["• Ative cupom no iFood"]);
    }

    #[test]
    fn renders_a_pdf_with_bundled_font() {
        let service = ReportService::new("./fonts", "DejaVuSans");
        let bytes = service
            .render_kpi_report(&view_with(&[("pedidos", 3.0)], &["Revise o cardápio"]))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_font_is_reported() {
        let service = ReportService::new("./nao-existe", "Roboto");
        let err = service.render_kpi_report(&DashboardView::default()).err().unwrap();
        assert!(matches!(err, AppError::FontNotFound(_)));
    }
}
