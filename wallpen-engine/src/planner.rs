use thiserror::Error;
use tracing::{debug, warn};
use wallpen_core::document::ElementId;
use wallpen_core::penetration::{
    HitIdentity, LinearSegment, PlannedPlacement, RayHit, SegmentCategory,
};

use crate::dedup::{dedupe, order_by_distance};
use crate::host::{ElementResolver, SourceSegment};
use crate::query::{GeometryQuery, TargetFilter};

/// 单根管线被跳过的原因。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("centerline is not a straight line")]
    NonLinearCenterline,
    #[error("centerline has zero length or non-finite coordinates")]
    DegenerateCenterline,
    #[error("diameter {0} is not a positive finite value")]
    InvalidDiameter(f64),
    #[error("wall {} (link {:?}) could not be resolved", .0.element.get(), .0.link.map(ElementId::get))]
    WallNotFound(HitIdentity),
    #[error("level of wall {} (link {:?}) could not be resolved", .0.element.get(), .0.link.map(ElementId::get))]
    LevelNotResolved(HitIdentity),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSegment {
    pub element: ElementId,
    pub category: SegmentCategory,
    pub reason: SkipReason,
}

/// 一个类别（风管或水管）的规划结果。
#[derive(Debug, Clone, PartialEq)]
pub struct PlanBatch {
    pub category: SegmentCategory,
    pub segments: usize,
    pub placements: Vec<PlannedPlacement>,
    pub skipped: Vec<SkippedSegment>,
}

impl PlanBatch {
    pub fn empty(category: SegmentCategory) -> Self {
        Self {
            category,
            segments: 0,
            placements: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// 沿管线中心线投射射线，筛选线段范围内的墙体穿越点并去重。
pub struct PenetrationPlanner<'a, Q, R> {
    query: &'a Q,
    resolver: &'a R,
    filter: TargetFilter,
}

impl<'a, Q, R> PenetrationPlanner<'a, Q, R>
where
    Q: GeometryQuery,
    R: ElementResolver,
{
    pub fn new(query: &'a Q, resolver: &'a R, filter: TargetFilter) -> Self {
        Self {
            query,
            resolver,
            filter,
        }
    }

    /// 规划单根管线。任一穿越点无法解析时整根管线不产生洞口。
    pub fn plan(&self, segment: &SourceSegment) -> Result<Vec<PlannedPlacement>, SkipReason> {
        let line = segment
            .location
            .as_line()
            .ok_or(SkipReason::NonLinearCenterline)?;
        let linear = LinearSegment::from_line(line).ok_or(SkipReason::DegenerateCenterline)?;
        if !segment.diameter.is_finite() || segment.diameter <= 0.0 {
            return Err(SkipReason::InvalidDiameter(segment.diameter));
        }

        let mut hits: Vec<RayHit> = self
            .query
            .find(linear.origin(), linear.direction(), &self.filter)
            .into_iter()
            .filter(|hit| linear.covers(hit.distance))
            .collect();
        order_by_distance(&mut hits);

        let mut placements = Vec::new();
        for hit in dedupe(hits) {
            let identity = hit.identity();
            self.resolver
                .resolve_wall(identity)
                .ok_or(SkipReason::WallNotFound(identity))?;
            let level = self
                .resolver
                .resolve_level(identity)
                .ok_or(SkipReason::LevelNotResolved(identity))?;
            placements.push(PlannedPlacement {
                source: segment.element,
                category: segment.category,
                wall: identity,
                level: level.id,
                distance: hit.distance,
                point: linear.point_at(hit.distance),
                size: segment.diameter,
            });
        }

        debug!(
            source = segment.element.get(),
            category = segment.category.label(),
            placements = placements.len(),
            "管线规划完成"
        );
        Ok(placements)
    }

    /// 依次规划同一类别的全部管线；被跳过的管线收集在 `skipped` 中。
    pub fn plan_all(&self, category: SegmentCategory, segments: &[SourceSegment]) -> PlanBatch {
        let mut batch = PlanBatch::empty(category);
        for segment in segments.iter().filter(|s| s.category == category) {
            batch.segments += 1;
            match self.plan(segment) {
                Ok(placements) => batch.placements.extend(placements),
                Err(reason) => {
                    warn!(
                        source = segment.element.get(),
                        category = category.label(),
                        reason = %reason,
                        "跳过管线"
                    );
                    batch.skipped.push(SkippedSegment {
                        element: segment.element,
                        category,
                        reason,
                    });
                }
            }
        }
        batch
    }
}
