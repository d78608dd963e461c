//! 洞口放置流程：前置检查、规划、按类别分批执行。

use tracing::{info, warn};
use wallpen_core::penetration::SegmentCategory;

use crate::errors::EngineError;
use crate::executor::PlacementExecutor;
use crate::host::{
    ElementResolver, FamilyTemplate, ParameterAccessor, ParameterLabels, PlacementHost,
    SourceModel, TransactionManager,
};
use crate::planner::{PenetrationPlanner, PlanBatch, SkippedSegment};
use crate::query::{GeometryQuery, TargetFilter, ViewRayIntersector};
use crate::session::{LinkedModel, Session, TargetDocument};

#[derive(Debug, Clone, PartialEq)]
pub struct HoleSettings {
    /// 源（暖通）文档标题需包含的文本。
    pub source_title_pattern: String,
    pub family_name: String,
    pub duct_transaction: String,
    pub pipe_transaction: String,
    pub labels: ParameterLabels,
    pub filter: TargetFilter,
}

impl HoleSettings {
    pub fn transaction_name(&self, category: SegmentCategory) -> &str {
        match category {
            SegmentCategory::Duct => &self.duct_transaction,
            SegmentCategory::Pipe => &self.pipe_transaction,
        }
    }
}

impl Default for HoleSettings {
    fn default() -> Self {
        Self {
            source_title_pattern: "ОВ".to_string(),
            family_name: "Отверстия".to_string(),
            duct_transaction: "Create hole for ducts".to_string(),
            pipe_transaction: "Create hole for pipes".to_string(),
            labels: ParameterLabels::default(),
            filter: TargetFilter::walls(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub category: SegmentCategory,
    pub segments: usize,
    pub planned: usize,
    pub created: usize,
    pub skipped: Vec<SkippedSegment>,
    /// 批次事务失败时的错误描述；此时 `created` 为 0。
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoleReport {
    pub target_title: String,
    pub source_title: String,
    pub batches: Vec<BatchReport>,
}

impl HoleReport {
    pub fn batch(&self, category: SegmentCategory) -> Option<&BatchReport> {
        self.batches.iter().find(|batch| batch.category == category)
    }

    pub fn total_created(&self) -> usize {
        self.batches.iter().map(|batch| batch.created).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.batches.iter().all(|batch| batch.error.is_none())
    }
}

/// 只读阶段：为每个类别规划洞口（先风管，后水管）。
pub fn plan_penetrations<S, Q, R>(
    source: &S,
    query: &Q,
    resolver: &R,
    filter: TargetFilter,
) -> Vec<PlanBatch>
where
    S: SourceModel,
    Q: GeometryQuery,
    R: ElementResolver,
{
    let planner = PenetrationPlanner::new(query, resolver, filter);
    SegmentCategory::ALL
        .into_iter()
        .map(|category| planner.plan_all(category, &source.list_segments(category)))
        .collect()
}

/// 写入阶段：每个批次独立事务。某一批次失败不影响已提交的批次。
pub fn execute_batches<H>(
    target: &mut H,
    template: &FamilyTemplate,
    batches: Vec<PlanBatch>,
    settings: &HoleSettings,
) -> Vec<BatchReport>
where
    H: PlacementHost + ParameterAccessor + TransactionManager,
{
    let executor = PlacementExecutor::new(template);
    batches
        .into_iter()
        .map(|batch| {
            let name = settings.transaction_name(batch.category);
            let (created, error) = match executor.execute(&mut *target, name, &batch.placements) {
                Ok(created) => (created, None),
                Err(err) => {
                    warn!(transaction = name, error = %err, "批次失败");
                    (0, Some(err.to_string()))
                }
            };
            BatchReport {
                category: batch.category,
                segments: batch.segments,
                planned: batch.placements.len(),
                created,
                skipped: batch.skipped,
                error,
            }
        })
        .collect()
}

/// 在会话的活动文档上执行洞口放置。
///
/// 源文档、洞口族与三维视图在任何事务打开之前查找，缺失即返回错误且不修改模型。
pub fn run_add_holes(
    session: &mut Session,
    settings: &HoleSettings,
) -> Result<HoleReport, EngineError> {
    let target = session.active().ok_or(EngineError::NoActiveDocument)?;
    let target_title = session.document(target)?.title().to_string();

    let source = session
        .find_document_by_title_substring(&settings.source_title_pattern, Some(target))
        .ok_or_else(|| EngineError::MissingSourceDocument {
            pattern: settings.source_title_pattern.clone(),
        })?;
    let template = session
        .find_family_template_by_name(target, &settings.family_name)
        .ok_or_else(|| EngineError::MissingFamilyTemplate {
            name: settings.family_name.clone(),
            document: target_title.clone(),
        })?;
    let view = session
        .find_3d_view(target)
        .ok_or_else(|| EngineError::Missing3DView {
            document: target_title.clone(),
        })?;

    let source_title = session.document(source)?.title().to_string();
    info!(target = %target_title, source = %source_title, "开始放置洞口");

    // 规划只读取墙体，全部完成后再进入写入阶段
    let batches = {
        let query = ViewRayIntersector::new(session, target, view)?;
        let resolver = LinkedModel::new(session, target)?;
        plan_penetrations(session.document(source)?, &query, &resolver, settings.filter)
    };

    let document = session.document_mut(target)?;
    let mut host = TargetDocument::new(document, &settings.labels);
    let batches = execute_batches(&mut host, &template, batches, settings);

    let report = HoleReport {
        target_title,
        source_title,
        batches,
    };
    info!(
        created = report.total_created(),
        complete = report.is_complete(),
        "洞口放置结束"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use wallpen_core::document::{Document, TransactionStatus};
    use wallpen_core::geometry::{Bounds3D, Line3, Point3};

    use super::*;
    use crate::planner::SkipReason;

    fn architecture(title: &str) -> Document {
        let mut doc = Document::new(title);
        let level = doc.add_level("L1", 0.0);
        doc.add_wall(
            "W1",
            Some(level),
            Bounds3D::from_corners(Point3::new(3.0, -5.0, 0.0), Point3::new(3.2, 5.0, 3.0)),
        );
        doc.add_view3d("{3D}", false);
        doc.add_family_symbol("Отверстия", "Square", ["Ширина", "Высота"]);
        doc
    }

    fn mechanical() -> Document {
        let mut doc = Document::new("Проект ОВ");
        doc.add_duct(
            Line3::new(Point3::new(0.0, 0.0, 1.0), Point3::new(10.0, 0.0, 1.0)),
            0.4,
        );
        doc.add_pipe(
            Line3::new(Point3::new(0.0, 1.0, 2.0), Point3::new(10.0, 1.0, 2.0)),
            0.1,
        );
        doc
    }

    #[test]
    fn missing_source_document_opens_no_transaction() {
        let mut session = Session::new();
        let target = session.open(architecture("Проект АР"));

        let err = run_add_holes(&mut session, &HoleSettings::default()).unwrap_err();
        assert!(matches!(err, EngineError::MissingSourceDocument { .. }));
        assert!(err.is_precondition());

        let doc = session.document(target).unwrap();
        assert!(doc.transactions().is_empty());
        assert_eq!(doc.instances().count(), 0);
    }

    #[test]
    fn missing_family_and_view_fail_fast() {
        let mut session = Session::new();
        let target = session.open(Document::new("Проект АР"));
        session.open(mechanical());

        let err = run_add_holes(&mut session, &HoleSettings::default()).unwrap_err();
        assert!(matches!(err, EngineError::MissingFamilyTemplate { .. }));

        session
            .document_mut(target)
            .unwrap()
            .add_family_symbol("Отверстия", "Square", ["Ширина", "Высота"]);
        session
            .document_mut(target)
            .unwrap()
            .add_view3d("template", true);
        let err = run_add_holes(&mut session, &HoleSettings::default()).unwrap_err();
        assert!(matches!(err, EngineError::Missing3DView { .. }));
        assert!(session.document(target).unwrap().transactions().is_empty());
    }

    #[test]
    fn ducts_then_pipes_in_separate_transactions() {
        let mut session = Session::new();
        let target = session.open(architecture("Проект АР"));
        session.open(mechanical());

        let report = run_add_holes(&mut session, &HoleSettings::default()).unwrap();
        assert_eq!(report.source_title, "Проект ОВ");
        assert_eq!(report.batch(SegmentCategory::Duct).unwrap().created, 1);
        assert_eq!(report.batch(SegmentCategory::Pipe).unwrap().created, 1);
        assert!(report.is_complete());

        let doc = session.document(target).unwrap();
        let names: Vec<&str> = doc.transactions().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Create hole for ducts", "Create hole for pipes"]);
        assert_eq!(doc.instances().count(), 2);
    }

    #[test]
    fn failed_pipe_batch_keeps_duct_placements() {
        let mut session = Session::new();
        let target = session.open(architecture("Проект АР"));
        let source = session.open(mechanical());

        // 第二根水管让水管批次有两处洞口，随后把其中一处改为无效放置点
        session.document_mut(source).unwrap().add_pipe(
            Line3::new(Point3::new(0.0, 2.0, 2.0), Point3::new(10.0, 2.0, 2.0)),
            0.1,
        );
        let labels = ParameterLabels::default();
        let template = session
            .find_family_template_by_name(target, "Отверстия")
            .unwrap();
        let mut batches = {
            let view = session.find_3d_view(target).unwrap();
            let query = ViewRayIntersector::new(&session, target, view).unwrap();
            let resolver = LinkedModel::new(&session, target).unwrap();
            plan_penetrations(
                session.document(source).unwrap(),
                &query,
                &resolver,
                TargetFilter::walls(),
            )
        };
        batches[1].placements[0].point = Point3::new(f64::NAN, 0.0, 0.0);

        let document = session.document_mut(target).unwrap();
        let mut host = TargetDocument::new(document, &labels);
        let reports = execute_batches(&mut host, &template, batches, &HoleSettings::default());

        assert_eq!(reports[0].created, 1);
        assert!(reports[0].error.is_none());
        assert_eq!(reports[1].created, 0);
        assert_eq!(reports[1].planned, 2);
        assert!(reports[1].error.is_some());

        let doc = session.document(target).unwrap();
        assert_eq!(doc.instances().count(), 1);
        assert_eq!(doc.transactions()[0].status, TransactionStatus::Committed);
        assert_eq!(doc.transactions()[1].status, TransactionStatus::RolledBack);
    }

    #[test]
    fn demo_project_places_host_and_linked_holes() {
        let mut session = Session::new();
        let demo = session.populate_demo();

        let report = run_add_holes(&mut session, &HoleSettings::default()).unwrap();
        let ducts = report.batch(SegmentCategory::Duct).unwrap();
        assert_eq!(ducts.segments, 3);
        assert_eq!(ducts.created, 3);
        assert_eq!(ducts.skipped.len(), 1);
        assert_eq!(ducts.skipped[0].reason, SkipReason::NonLinearCenterline);
        assert_eq!(report.batch(SegmentCategory::Pipe).unwrap().created, 3);

        let doc = session.document(demo.architecture).unwrap();
        let linked = doc.instances().filter(|i| i.host.link.is_some()).count();
        assert_eq!(linked, 2);
        assert!(doc.instances().all(|i| i.level.link == i.host.link));
    }
}
