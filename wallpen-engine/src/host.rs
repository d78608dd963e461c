//! 宿主协作接口。引擎只通过这些 trait 访问模型，具体实现见 `session`。

use wallpen_core::document::{ElementId, FamilySymbol, Level, Wall};
use wallpen_core::geometry::Curve;
use wallpen_core::penetration::{HitIdentity, ParameterKind, PlannedPlacement, SegmentCategory};

use crate::errors::EngineError;

/// 源模型中的一根风管或水管。
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSegment {
    pub element: ElementId,
    pub category: SegmentCategory,
    pub location: Curve,
    /// 按类别读取的直径（风管直径或水管直径）。
    pub diameter: f64,
}

/// 洞口占位族。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyTemplate {
    pub symbol: ElementId,
    pub family_name: String,
    pub name: String,
}

impl From<&FamilySymbol> for FamilyTemplate {
    fn from(symbol: &FamilySymbol) -> Self {
        Self {
            symbol: symbol.id,
            family_name: symbol.family_name.clone(),
            name: symbol.name.clone(),
        }
    }
}

/// 参数种类到宿主参数名的映射。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLabels {
    pub width: String,
    pub height: String,
}

impl ParameterLabels {
    pub fn label(&self, kind: ParameterKind) -> &str {
        match kind {
            ParameterKind::Width => &self.width,
            ParameterKind::Height => &self.height,
        }
    }
}

impl Default for ParameterLabels {
    fn default() -> Self {
        Self {
            width: "Ширина".to_string(),
            height: "Высота".to_string(),
        }
    }
}

pub trait SourceModel {
    fn list_segments(&self, category: SegmentCategory) -> Vec<SourceSegment>;
}

/// 将命中标识解析回墙及其标高（可能位于链接文档中）。
pub trait ElementResolver {
    fn resolve_wall(&self, identity: HitIdentity) -> Option<&Wall>;
    fn resolve_level(&self, identity: HitIdentity) -> Option<&Level>;
}

pub trait PlacementHost {
    fn create_instance(
        &mut self,
        template: &FamilyTemplate,
        placement: &PlannedPlacement,
    ) -> Result<ElementId, EngineError>;
}

pub trait ParameterAccessor {
    fn get_scalar(&self, instance: ElementId, kind: ParameterKind) -> Result<f64, EngineError>;
    fn set_scalar(
        &mut self,
        instance: ElementId,
        kind: ParameterKind,
        value: f64,
    ) -> Result<(), EngineError>;
}

/// 作用域事务：`work` 返回 `Ok` 时提交，返回 `Err` 或 panic 时整体回滚。
pub trait TransactionManager {
    fn transaction<T>(
        &mut self,
        name: &str,
        work: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError>;
}
