use tracing::{debug, trace};
use wallpen_core::document::{Document, ElementId};
use wallpen_core::geometry::{Point3, Vector3};
use wallpen_core::penetration::{HitIdentity, RayHit};

use crate::errors::EngineError;
use crate::session::{DocumentId, Session};

/// 射线查询目标。可投射的只有墙体；这里决定是否同时搜索链接文档。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFilter {
    pub include_host: bool,
    pub include_links: bool,
}

impl TargetFilter {
    /// 宿主文档及所有已加载链接中的墙。
    pub fn walls() -> Self {
        Self {
            include_host: true,
            include_links: true,
        }
    }

    pub fn host_walls() -> Self {
        Self {
            include_host: true,
            include_links: false,
        }
    }

    #[inline]
    fn accepts(&self, link: Option<ElementId>) -> bool {
        if link.is_some() {
            self.include_links
        } else {
            self.include_host
        }
    }
}

impl Default for TargetFilter {
    fn default() -> Self {
        Self::walls()
    }
}

/// 射线与场景求交。
///
/// 返回所有穿越面，按与起点的距离升序排列。每次调用都重新读取场景状态。
/// `direction` 由调用方保证有限且非零。
pub trait GeometryQuery {
    fn find(&self, origin: Point3, direction: Vector3, filter: &TargetFilter) -> Vec<RayHit>;
}

#[derive(Debug, Clone, Copy)]
struct WallSource<'a> {
    link: Option<ElementId>,
    offset: Vector3,
    document: &'a Document,
}

/// 基于三维视图的射线求交器，覆盖目标文档及其链接文档中的墙。
#[derive(Debug)]
pub struct ViewRayIntersector<'a> {
    sources: Vec<WallSource<'a>>,
}

impl<'a> ViewRayIntersector<'a> {
    /// 视图必须是目标文档中的非模板三维视图。
    pub fn new(
        session: &'a Session,
        target: DocumentId,
        view: ElementId,
    ) -> Result<Self, EngineError> {
        let document = session.document(target)?;
        document
            .view(view)
            .filter(|candidate| !candidate.is_template)
            .ok_or(EngineError::InvalidView(view.get()))?;

        let mut sources = vec![WallSource {
            link: None,
            offset: Vector3::ZERO,
            document,
        }];
        for link in document.links() {
            match session.find_document_by_title(&link.linked_title) {
                Some(linked) => sources.push(WallSource {
                    link: Some(link.id),
                    offset: link.offset,
                    document: linked,
                }),
                None => debug!(
                    link = link.id.get(),
                    title = %link.linked_title,
                    "链接文档未打开，跳过"
                ),
            }
        }

        Ok(Self { sources })
    }
}

impl GeometryQuery for ViewRayIntersector<'_> {
    fn find(&self, origin: Point3, direction: Vector3, filter: &TargetFilter) -> Vec<RayHit> {
        debug_assert!(origin.is_finite() && direction.is_finite());
        let mut hits = Vec::new();

        for source in self.sources.iter().filter(|s| filter.accepts(s.link)) {
            for wall in source.document.walls() {
                let solid = wall.solid.translated(source.offset);
                let Some((near, far)) = solid.ray_interval(origin, direction) else {
                    continue;
                };
                let identity = HitIdentity {
                    link: source.link,
                    element: wall.id,
                };
                // 入射面与出射面各记一次；起点在墙内时只有出射面
                if near >= 0.0 {
                    hits.push(RayHit::new(near, identity));
                }
                if far > near {
                    hits.push(RayHit::new(far, identity));
                }
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        for hit in &hits {
            trace!(
                distance = hit.distance,
                element = hit.element.get(),
                link = hit.link.map(ElementId::get),
                "ray hit"
            );
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use wallpen_core::geometry::{Bounds3D, Point3, Vector3};

    use super::*;

    fn slab(x: f64, thickness: f64) -> Bounds3D {
        Bounds3D::from_corners(
            Point3::new(x, -5.0, 0.0),
            Point3::new(x + thickness, 5.0, 3.0),
        )
    }

    fn session_with_link(offset: Vector3) -> (Session, DocumentId, ElementId, ElementId, ElementId) {
        let mut host = Document::new("AR");
        let level = host.add_level("L1", 0.0);
        let wall = host.add_wall("W1", Some(level), slab(3.0, 0.2));
        let view = host.add_view3d("{3D}", false);
        let link = host.add_link("KR", offset);

        let mut structure = Document::new("KR");
        let kr_level = structure.add_level("L1", 0.0);
        structure.add_wall("KW1", Some(kr_level), slab(5.0, 0.3));

        let mut session = Session::new();
        let target = session.open(host);
        session.open(structure);
        (session, target, view, wall, link)
    }

    #[test]
    fn finds_entry_and_exit_sorted_by_distance() {
        let (session, target, view, wall, link) = session_with_link(Vector3::ZERO);
        let query = ViewRayIntersector::new(&session, target, view).expect("usable view");

        let hits = query.find(
            Point3::new(0.0, 0.0, 1.5),
            Vector3::new(1.0, 0.0, 0.0),
            &TargetFilter::walls(),
        );
        let distances: Vec<f64> = hits.iter().map(|hit| hit.distance).collect();
        assert_eq!(distances.len(), 4);
        assert!((distances[0] - 3.0).abs() < 1e-9);
        assert!((distances[1] - 3.2).abs() < 1e-9);
        assert!((distances[2] - 5.0).abs() < 1e-9);
        assert!((distances[3] - 5.3).abs() < 1e-9);

        assert_eq!(hits[0].identity(), HitIdentity::host(wall));
        assert_eq!(hits[2].link, Some(link));
    }

    #[test]
    fn link_offset_moves_linked_walls() {
        let (session, target, view, _, _) = session_with_link(Vector3::new(2.0, 0.0, 0.0));
        let query = ViewRayIntersector::new(&session, target, view).unwrap();
        let hits = query.find(
            Point3::new(0.0, 0.0, 1.5),
            Vector3::new(1.0, 0.0, 0.0),
            &TargetFilter::walls(),
        );
        let linked: Vec<&RayHit> = hits.iter().filter(|hit| hit.link.is_some()).collect();
        assert!((linked[0].distance - 7.0).abs() < 1e-9);
    }

    #[test]
    fn filter_can_exclude_links() {
        let (session, target, view, _, _) = session_with_link(Vector3::ZERO);
        let query = ViewRayIntersector::new(&session, target, view).unwrap();
        let hits = query.find(
            Point3::new(0.0, 0.0, 1.5),
            Vector3::new(1.0, 0.0, 0.0),
            &TargetFilter::host_walls(),
        );
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.link.is_none()));
    }

    #[test]
    fn origin_inside_wall_reports_exit_only() {
        let (session, target, view, wall, _) = session_with_link(Vector3::ZERO);
        let query = ViewRayIntersector::new(&session, target, view).unwrap();
        let hits = query.find(
            Point3::new(3.1, 0.0, 1.5),
            Vector3::new(1.0, 0.0, 0.0),
            &TargetFilter::host_walls(),
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].element, wall);
        assert!((hits[0].distance - 0.1).abs() < 1e-9);
    }

    #[test]
    fn template_view_is_rejected() {
        let mut host = Document::new("AR");
        let template = host.add_view3d("Template", true);
        let mut session = Session::new();
        let target = session.open(host);

        let err = ViewRayIntersector::new(&session, target, template).unwrap_err();
        assert!(matches!(err, EngineError::InvalidView(_)));
    }

    #[test]
    fn unopened_link_is_ignored() {
        let mut host = Document::new("AR");
        let view = host.add_view3d("{3D}", false);
        host.add_link("missing", Vector3::ZERO);
        let mut session = Session::new();
        let target = session.open(host);

        let query = ViewRayIntersector::new(&session, target, view).unwrap();
        assert!(
            query
                .find(
                    Point3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.0, 0.0, 0.0),
                    &TargetFilter::walls()
                )
                .is_empty()
        );
    }
}
