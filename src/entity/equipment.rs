use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "equipment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub equipment_type: String,
    pub daily_rate: i64,
    pub security_deposit: Option<i64>,
    pub status: String,
    pub min_rental_days: i32,
    pub max_rental_days: Option<i32>,
    pub delivery_available: bool,
    pub location: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::equipment_rentals::Entity")]
    EquipmentRentals,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::equipment_rentals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EquipmentRentals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
