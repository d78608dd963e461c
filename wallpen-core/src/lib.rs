pub mod geometry {
    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    /// 三维点，内部以 `glam::DVec3` 表示，与宿主模型的双精度坐标一致。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn from_vec(vec: DVec3) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn translate(self, offset: Vector3) -> Self {
            Self(self.0 + offset.0)
        }

        /// 沿方向前进 `distance` 后的点：`self + direction * distance`。
        #[inline]
        pub fn advance(self, direction: Vector3, distance: f64) -> Self {
            Self(self.0 + direction.0 * distance)
        }

        #[inline]
        pub fn distance_to(self, other: Point3) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 三维向量。射线方向、链接偏移都用它表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        pub const ZERO: Vector3 = Vector3(DVec3::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn from_points(start: Point3, end: Point3) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if !len.is_finite() || len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 轴对齐包围盒，墙体实体以此近似。
    ///
    /// 反序列化经过 `from_corners`：文件中 min/max 颠倒的角点会被整理，非有限坐标被拒绝。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(try_from = "BoundsCorners", into = "BoundsCorners")]
    pub struct Bounds3D {
        min: Point3,
        max: Point3,
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    struct BoundsCorners {
        min: Point3,
        max: Point3,
    }

    impl TryFrom<BoundsCorners> for Bounds3D {
        type Error = String;

        fn try_from(corners: BoundsCorners) -> Result<Self, Self::Error> {
            if !corners.min.is_finite() || !corners.max.is_finite() {
                return Err(format!(
                    "bounds corners must be finite: {:?} / {:?}",
                    corners.min.as_vec3(),
                    corners.max.as_vec3()
                ));
            }
            Ok(Self::from_corners(corners.min, corners.max))
        }
    }

    impl From<Bounds3D> for BoundsCorners {
        fn from(bounds: Bounds3D) -> Self {
            Self {
                min: bounds.min(),
                max: bounds.max(),
            }
        }
    }

    impl Bounds3D {
        /// 由任意两个对角点构造，自动整理成 min/max。
        pub fn from_corners(a: Point3, b: Point3) -> Self {
            Self {
                min: Point3::from_vec(a.0.min(b.0)),
                max: Point3::from_vec(a.0.max(b.0)),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
                max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y() || self.min.z() > self.max.z()
        }

        #[inline]
        pub fn min(&self) -> Point3 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point3 {
            self.max
        }

        #[inline]
        pub fn translated(&self, offset: Vector3) -> Self {
            Self {
                min: self.min.translate(offset),
                max: self.max.translate(offset),
            }
        }

        /// 射线与包围盒求交（slab 法）。
        ///
        /// 返回射线参数区间 `(t_near, t_far)`；`t_near` 为负表示起点位于盒内。
        /// 射线完全错过或盒体整体位于起点之后时返回 `None`。
        pub fn ray_interval(&self, origin: Point3, direction: Vector3) -> Option<(f64, f64)> {
            if self.is_empty() {
                return None;
            }
            let o = origin.as_vec3();
            let d = direction.as_vec3();
            let mut t_near = f64::NEG_INFINITY;
            let mut t_far = f64::INFINITY;

            for axis in 0..3 {
                let (o_a, d_a) = (o[axis], d[axis]);
                let (min_a, max_a) = (self.min.0[axis], self.max.0[axis]);
                if d_a.abs() <= f64::EPSILON {
                    // 与该轴平行：起点必须落在 slab 内
                    if o_a < min_a || o_a > max_a {
                        return None;
                    }
                    continue;
                }
                let inv = 1.0 / d_a;
                let mut t0 = (min_a - o_a) * inv;
                let mut t1 = (max_a - o_a) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_near = t_near.max(t0);
                t_far = t_far.min(t1);
                if t_near > t_far {
                    return None;
                }
            }

            if t_far < 0.0 { None } else { Some((t_near, t_far)) }
        }
    }

    /// 直线段，风管/水管定位线的常见形态。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Line3 {
        pub start: Point3,
        pub end: Point3,
    }

    impl Line3 {
        #[inline]
        pub fn new(start: Point3, end: Point3) -> Self {
            Self { start, end }
        }

        #[inline]
        pub fn length(&self) -> f64 {
            self.start.distance_to(self.end)
        }

        /// 单位方向；退化（零长度）线段返回 `None`。
        #[inline]
        pub fn direction(&self) -> Option<Vector3> {
            Vector3::from_points(self.start, self.end).normalize()
        }
    }

    /// 三点圆弧。仅用于描述模型中存在但不受支持的弯曲定位线。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Arc3 {
        pub start: Point3,
        pub mid: Point3,
        pub end: Point3,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "lowercase")]
    pub enum Curve {
        Line(Line3),
        Arc(Arc3),
    }

    impl Curve {
        #[inline]
        pub fn as_line(&self) -> Option<&Line3> {
            match self {
                Curve::Line(line) => Some(line),
                Curve::Arc(_) => None,
            }
        }
    }

    impl From<Line3> for Curve {
        fn from(value: Line3) -> Self {
            Curve::Line(value)
        }
    }

    impl From<Arc3> for Curve {
        fn from(value: Arc3) -> Self {
            Curve::Arc(value)
        }
    }
}

pub mod penetration {
    use serde::{Deserialize, Serialize};

    use crate::document::ElementId;
    use crate::geometry::{Line3, Point3, Vector3};

    /// 源构件类别。类别只决定读取哪种直径以及归入哪个事务批次。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SegmentCategory {
        Duct,
        Pipe,
    }

    impl SegmentCategory {
        /// 执行顺序：先风管，后水管。
        pub const ALL: [SegmentCategory; 2] = [SegmentCategory::Duct, SegmentCategory::Pipe];

        pub fn label(self) -> &'static str {
            match self {
                SegmentCategory::Duct => "duct",
                SegmentCategory::Pipe => "pipe",
            }
        }
    }

    /// 参数种类，由适配层映射为宿主参数名。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ParameterKind {
        Width,
        Height,
    }

    /// 风管/水管中心线：起点、单位方向、长度。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct LinearSegment {
        origin: Point3,
        direction: Vector3,
        length: f64,
    }

    impl LinearSegment {
        /// 从直线定位线派生；零长度或非有限坐标返回 `None`。
        pub fn from_line(line: &Line3) -> Option<Self> {
            if !line.start.is_finite() || !line.end.is_finite() {
                return None;
            }
            let direction = line.direction()?;
            Some(Self {
                origin: line.start,
                direction,
                length: line.length(),
            })
        }

        #[inline]
        pub fn origin(&self) -> Point3 {
            self.origin
        }

        #[inline]
        pub fn direction(&self) -> Vector3 {
            self.direction
        }

        #[inline]
        pub fn length(&self) -> f64 {
            self.length
        }

        /// 距离是否落在线段自身范围 `[0, length]` 内。
        #[inline]
        pub fn covers(&self, distance: f64) -> bool {
            distance.is_finite() && (0.0..=self.length).contains(&distance)
        }

        #[inline]
        pub fn point_at(&self, distance: f64) -> Point3 {
            self.origin.advance(self.direction, distance)
        }
    }

    /// 去重键：链接实例 + 构件。链接为 `None` 表示宿主文档自身的构件。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct HitIdentity {
        pub link: Option<ElementId>,
        pub element: ElementId,
    }

    impl HitIdentity {
        #[inline]
        pub fn host(element: ElementId) -> Self {
            Self {
                link: None,
                element,
            }
        }

        #[inline]
        pub fn linked(link: ElementId, element: ElementId) -> Self {
            Self {
                link: Some(link),
                element,
            }
        }
    }

    /// 单次射线查询的命中记录，规划完成后即丢弃。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct RayHit {
        pub distance: f64,
        pub element: ElementId,
        pub link: Option<ElementId>,
    }

    impl RayHit {
        #[inline]
        pub fn new(distance: f64, identity: HitIdentity) -> Self {
            Self {
                distance,
                element: identity.element,
                link: identity.link,
            }
        }

        #[inline]
        pub fn identity(&self) -> HitIdentity {
            HitIdentity {
                link: self.link,
                element: self.element,
            }
        }
    }

    /// 一个待放置的洞口占位构件。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct PlannedPlacement {
        pub source: ElementId,
        pub category: SegmentCategory,
        pub wall: HitIdentity,
        /// 墙所在标高，位于墙所属文档内。
        pub level: ElementId,
        pub distance: f64,
        pub point: Point3,
        /// 方形开洞边长，同时用于宽与高。
        pub size: f64,
    }
}

pub mod document {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds3D, Curve, Point3, Vector3};
    use crate::penetration::{HitIdentity, SegmentCategory};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct ElementId(u64);

    impl ElementId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 可能位于链接文档中的构件：`link` 为 `None` 时指本文档。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ElementRef {
        pub link: Option<ElementId>,
        pub element: ElementId,
    }

    impl ElementRef {
        #[inline]
        pub fn host(element: ElementId) -> Self {
            Self {
                link: None,
                element,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Level {
        pub id: ElementId,
        pub name: String,
        pub elevation: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Wall {
        pub id: ElementId,
        pub name: String,
        /// 墙的基准标高；导入不完整的模型可能缺失。
        #[serde(default)]
        pub level: Option<ElementId>,
        pub solid: Bounds3D,
    }

    /// 风管或水管。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MepCurve {
        pub id: ElementId,
        pub category: SegmentCategory,
        pub location: Curve,
        pub diameter: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct View3D {
        pub id: ElementId,
        pub name: String,
        #[serde(default)]
        pub is_template: bool,
    }

    /// 族类型。`parameters` 列出其实例可写的参数名。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FamilySymbol {
        pub id: ElementId,
        pub family_name: String,
        pub name: String,
        #[serde(default)]
        pub parameters: Vec<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FamilyInstance {
        pub id: ElementId,
        pub symbol: ElementId,
        pub host: HitIdentity,
        /// 与宿主墙位于同一文档的标高。
        pub level: ElementRef,
        pub point: Point3,
        #[serde(default)]
        pub parameters: BTreeMap<String, f64>,
    }

    /// 链接实例：按标题引用另一份打开的文档，并整体平移 `offset`。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LinkInstance {
        pub id: ElementId,
        pub linked_title: String,
        #[serde(default = "LinkInstance::default_offset")]
        pub offset: Vector3,
    }

    impl LinkInstance {
        fn default_offset() -> Vector3 {
            Vector3::ZERO
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Committed,
        RolledBack,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionRecord {
        pub name: String,
        pub status: TransactionStatus,
    }

    /// 事务开始时的可回滚状态。只有放置实例会被事务修改。
    #[derive(Debug, Clone)]
    pub struct DocumentSnapshot {
        instances: Vec<FamilyInstance>,
        next_id: u64,
    }

    /// 单个模型文档（建筑或机电专业）。
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct Document {
        title: String,
        #[serde(default)]
        levels: Vec<Level>,
        #[serde(default)]
        walls: Vec<Wall>,
        #[serde(default)]
        ducts: Vec<MepCurve>,
        #[serde(default)]
        pipes: Vec<MepCurve>,
        #[serde(default)]
        views: Vec<View3D>,
        #[serde(default)]
        family_symbols: Vec<FamilySymbol>,
        #[serde(default)]
        instances: Vec<FamilyInstance>,
        #[serde(default)]
        links: Vec<LinkInstance>,
        #[serde(default)]
        transactions: Vec<TransactionRecord>,
        #[serde(skip)]
        next_id: u64,
    }

    impl Document {
        pub fn new(title: impl Into<String>) -> Self {
            Self {
                title: title.into(),
                ..Self::default()
            }
        }

        #[inline]
        pub fn title(&self) -> &str {
            &self.title
        }

        pub fn add_level(&mut self, name: impl Into<String>, elevation: f64) -> ElementId {
            let id = self.next_id();
            self.levels.push(Level {
                id,
                name: name.into(),
                elevation,
            });
            id
        }

        pub fn add_wall(
            &mut self,
            name: impl Into<String>,
            level: Option<ElementId>,
            solid: Bounds3D,
        ) -> ElementId {
            let id = self.next_id();
            self.walls.push(Wall {
                id,
                name: name.into(),
                level,
                solid,
            });
            id
        }

        pub fn add_duct(&mut self, location: impl Into<Curve>, diameter: f64) -> ElementId {
            self.add_mep_curve(SegmentCategory::Duct, location.into(), diameter)
        }

        pub fn add_pipe(&mut self, location: impl Into<Curve>, diameter: f64) -> ElementId {
            self.add_mep_curve(SegmentCategory::Pipe, location.into(), diameter)
        }

        fn add_mep_curve(
            &mut self,
            category: SegmentCategory,
            location: Curve,
            diameter: f64,
        ) -> ElementId {
            let id = self.next_id();
            let curve = MepCurve {
                id,
                category,
                location,
                diameter,
            };
            match category {
                SegmentCategory::Duct => self.ducts.push(curve),
                SegmentCategory::Pipe => self.pipes.push(curve),
            }
            id
        }

        pub fn add_view3d(&mut self, name: impl Into<String>, is_template: bool) -> ElementId {
            let id = self.next_id();
            self.views.push(View3D {
                id,
                name: name.into(),
                is_template,
            });
            id
        }

        pub fn add_family_symbol<I, S>(
            &mut self,
            family_name: impl Into<String>,
            name: impl Into<String>,
            parameters: I,
        ) -> ElementId
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let id = self.next_id();
            self.family_symbols.push(FamilySymbol {
                id,
                family_name: family_name.into(),
                name: name.into(),
                parameters: parameters.into_iter().map(Into::into).collect(),
            });
            id
        }

        pub fn add_link(&mut self, linked_title: impl Into<String>, offset: Vector3) -> ElementId {
            let id = self.next_id();
            self.links.push(LinkInstance {
                id,
                linked_title: linked_title.into(),
                offset,
            });
            id
        }

        /// 放置族实例；实例参数按族类型声明初始化为 0。
        /// 族类型不存在时返回 `None`。
        pub fn add_instance(
            &mut self,
            symbol: ElementId,
            host: HitIdentity,
            level: ElementRef,
            point: Point3,
        ) -> Option<ElementId> {
            let parameters = self
                .family_symbol(symbol)?
                .parameters
                .iter()
                .map(|label| (label.clone(), 0.0))
                .collect();
            let id = self.next_id();
            self.instances.push(FamilyInstance {
                id,
                symbol,
                host,
                level,
                point,
                parameters,
            });
            Some(id)
        }

        pub fn level(&self, id: ElementId) -> Option<&Level> {
            self.levels.iter().find(|level| level.id == id)
        }

        pub fn wall(&self, id: ElementId) -> Option<&Wall> {
            self.walls.iter().find(|wall| wall.id == id)
        }

        pub fn walls(&self) -> impl Iterator<Item = &Wall> {
            self.walls.iter()
        }

        pub fn mep_curves(&self, category: SegmentCategory) -> impl Iterator<Item = &MepCurve> {
            match category {
                SegmentCategory::Duct => self.ducts.iter(),
                SegmentCategory::Pipe => self.pipes.iter(),
            }
        }

        pub fn view(&self, id: ElementId) -> Option<&View3D> {
            self.views.iter().find(|view| view.id == id)
        }

        pub fn views(&self) -> impl Iterator<Item = &View3D> {
            self.views.iter()
        }

        pub fn family_symbol(&self, id: ElementId) -> Option<&FamilySymbol> {
            self.family_symbols.iter().find(|symbol| symbol.id == id)
        }

        pub fn family_symbols(&self) -> impl Iterator<Item = &FamilySymbol> {
            self.family_symbols.iter()
        }

        pub fn instance(&self, id: ElementId) -> Option<&FamilyInstance> {
            self.instances.iter().find(|instance| instance.id == id)
        }

        pub fn instance_mut(&mut self, id: ElementId) -> Option<&mut FamilyInstance> {
            self.instances.iter_mut().find(|instance| instance.id == id)
        }

        pub fn instances(&self) -> impl Iterator<Item = &FamilyInstance> {
            self.instances.iter()
        }

        pub fn link(&self, id: ElementId) -> Option<&LinkInstance> {
            self.links.iter().find(|link| link.id == id)
        }

        pub fn links(&self) -> impl Iterator<Item = &LinkInstance> {
            self.links.iter()
        }

        pub fn transactions(&self) -> &[TransactionRecord] {
            &self.transactions
        }

        pub fn record_transaction(&mut self, name: impl Into<String>, status: TransactionStatus) {
            self.transactions.push(TransactionRecord {
                name: name.into(),
                status,
            });
        }

        pub fn snapshot(&self) -> DocumentSnapshot {
            DocumentSnapshot {
                instances: self.instances.clone(),
                next_id: self.next_id,
            }
        }

        pub fn restore(&mut self, snapshot: DocumentSnapshot) {
            self.instances = snapshot.instances;
            self.next_id = snapshot.next_id;
        }

        fn max_element_id(&self) -> u64 {
            let ids = self
                .levels
                .iter()
                .map(|e| e.id)
                .chain(self.walls.iter().map(|e| e.id))
                .chain(self.ducts.iter().map(|e| e.id))
                .chain(self.pipes.iter().map(|e| e.id))
                .chain(self.views.iter().map(|e| e.id))
                .chain(self.family_symbols.iter().map(|e| e.id))
                .chain(self.instances.iter().map(|e| e.id))
                .chain(self.links.iter().map(|e| e.id));
            ids.map(ElementId::get).max().unwrap_or(0)
        }

        fn next_id(&mut self) -> ElementId {
            // 反序列化后的文档不携带计数器，首次分配时从现有最大 ID 续接。
            if self.next_id == 0 {
                self.next_id = self.max_element_id() + 1;
            }
            let id = ElementId::new(self.next_id);
            self.next_id += 1;
            id
        }
    }

}

#[cfg(test)]
mod tests {
    use crate::geometry::{Bounds3D, Curve, Line3, Point3, Vector3};
    use crate::penetration::{HitIdentity, LinearSegment, RayHit};
    use crate::document::ElementId;

    fn unit_box_at(x: f64) -> Bounds3D {
        Bounds3D::from_corners(Point3::new(x, -1.0, -1.0), Point3::new(x + 1.0, 1.0, 1.0))
    }

    #[test]
    fn ray_interval_reports_entry_and_exit() {
        let bounds = unit_box_at(3.0);
        let (near, far) = bounds
            .ray_interval(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0))
            .expect("ray should hit");
        assert!((near - 3.0).abs() < 1e-9);
        assert!((far - 4.0).abs() < 1e-9);
    }

    #[test]
    fn ray_interval_misses_parallel_offset_and_behind() {
        let bounds = unit_box_at(3.0);
        // 平行于 x 轴但在盒外
        assert!(
            bounds
                .ray_interval(Point3::new(0.0, 5.0, 0.0), Vector3::new(1.0, 0.0, 0.0))
                .is_none()
        );
        // 盒体位于起点之后
        assert!(
            bounds
                .ray_interval(Point3::new(10.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn deserialized_bounds_are_normalised() {
        let bounds: Bounds3D =
            serde_json::from_str(r#"{"min":[3.2,5.0,3.0],"max":[3.0,-5.0,0.0]}"#).unwrap();
        assert_eq!(bounds.min(), Point3::new(3.0, -5.0, 0.0));
        assert_eq!(bounds.max(), Point3::new(3.2, 5.0, 3.0));
        assert!(!bounds.is_empty());

        let json = serde_json::to_string(&bounds).unwrap();
        assert_eq!(json, r#"{"min":[3.0,-5.0,0.0],"max":[3.2,5.0,3.0]}"#);
    }

    #[test]
    fn ray_starting_inside_has_negative_near() {
        let bounds = unit_box_at(3.0);
        let (near, far) = bounds
            .ray_interval(Point3::new(3.5, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert!(near < 0.0);
        assert!((far - 0.5).abs() < 1e-9);
    }

    #[test]
    fn diagonal_ray_hits_box() {
        let bounds = unit_box_at(3.0);
        let dir = Vector3::new(1.0, 0.1, 0.0).normalize().unwrap();
        let (near, _) = bounds.ray_interval(Point3::new(0.0, 0.0, 0.0), dir).unwrap();
        let entry = Point3::new(0.0, 0.0, 0.0).advance(dir, near);
        assert!((entry.x() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn linear_segment_requires_straight_non_degenerate_line() {
        let line = Line3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
        let segment = LinearSegment::from_line(&line).expect("straight line");
        assert!((segment.length() - 10.0).abs() < 1e-12);
        assert!((segment.direction().x() - 1.0).abs() < 1e-12);
        assert!(segment.covers(0.0));
        assert!(segment.covers(10.0));
        assert!(!segment.covers(10.5));
        assert!(!segment.covers(-0.1));
        assert!(!segment.covers(f64::NAN));

        let point = Line3::new(Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0));
        assert!(LinearSegment::from_line(&point).is_none());

        let curve = Curve::from(line);
        assert!(curve.as_line().is_some());
    }

    #[test]
    fn ray_hit_identity_includes_link() {
        let host = RayHit::new(1.0, HitIdentity::host(ElementId::new(5)));
        let linked = RayHit::new(1.0, HitIdentity::linked(ElementId::new(2), ElementId::new(5)));
        assert_ne!(host.identity(), linked.identity());
        assert_eq!(linked.identity().link, Some(ElementId::new(2)));
    }
}
