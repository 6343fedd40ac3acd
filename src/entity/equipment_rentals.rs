use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "equipment_rentals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub renter_id: Uuid,
    pub start_date: Date,
    pub end_date: Date,
    pub rental_days: i32,
    pub daily_rate: i64,
    pub total_amount: i64,
    pub security_deposit: Option<i64>,
    pub delivery_required: bool,
    pub delivery_address: Option<String>,
    pub special_instructions: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::equipment::Entity",
        from = "Column::EquipmentId",
        to = "super::equipment::Column::Id"
    )]
    Equipment,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::RenterId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::equipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Equipment.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
